use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::AtomicBool;

use fixed_collections::RingQueue;
use tracing::debug;

use crate::SpinLock;
use crate::fast::{FastDispatcher, FastInner, FixedRegistry, FixedSignal};

const DEFAULT_NAME: &str = "fast-dispatcher";

/// Builder for creating an instance of [`FastDispatcher`].
///
/// # Examples
///
/// ```
/// use signal_dispatch::fast::{FastDispatcher, FixedSignal};
///
/// #[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// struct Channel(u8);
///
/// impl FixedSignal for Channel {
///     const COUNT: usize = 8;
///
///     fn index(self) -> usize {
///         usize::from(self.0)
///     }
/// }
///
/// let dispatcher = FastDispatcher::<Channel, f32, 2, 64>::builder()
///     .name("audio")
///     .build();
///
/// assert_eq!(dispatcher.name(), "audio");
/// ```
#[must_use]
pub struct FastDispatcherBuilder<
    S,
    A,
    const HANDLERS: usize,
    const EVENTS: usize,
    const CAPACITY: usize,
> {
    name: Option<String>,

    _types: PhantomData<fn() -> (S, A)>,
}

impl<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize> fmt::Debug
    for FastDispatcherBuilder<S, A, HANDLERS, EVENTS, CAPACITY>
{
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastDispatcherBuilder")
            .field("signal_type", &format_args!("{}", type_name::<S>()))
            .field("args_type", &format_args!("{}", type_name::<A>()))
            .field("name", &self.name)
            .field("handlers_per_signal", &HANDLERS)
            .field("event_capacity", &EVENTS)
            .finish()
    }
}

impl<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize>
    FastDispatcherBuilder<S, A, HANDLERS, EVENTS, CAPACITY>
where
    S: FixedSignal,
    A: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            name: None,
            _types: PhantomData,
        }
    }

    /// Sets the name that identifies the dispatcher in log messages.
    ///
    /// Default is "fast-dispatcher".
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the dispatcher, allocating storage for `S::COUNT * HANDLERS` handlers and
    /// `EVENTS` events.
    #[must_use]
    pub fn build(self) -> FastDispatcher<S, A, HANDLERS, EVENTS, CAPACITY> {
        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());

        debug!(
            dispatcher = %name,
            signal_type = type_name::<S>(),
            args_type = type_name::<A>(),
            signal_count = S::COUNT,
            handlers_per_signal = HANDLERS,
            event_capacity = EVENTS,
            handler_capacity = CAPACITY,
            "created fast dispatcher"
        );

        FastDispatcher::from_inner(FastInner {
            name,
            registry: SpinLock::new(FixedRegistry::new()),
            queue: SpinLock::new(RingQueue::new()),
            responding: AtomicBool::new(false),
        })
    }
}
