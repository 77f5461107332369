use std::any::type_name;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::atomic::AtomicBool;

use parking_lot::Mutex;
use tracing::debug;

use crate::{Dispatcher, DispatcherInner, EventQueue, HandlerRegistry};

const DEFAULT_NAME: &str = "dispatcher";

/// Builder for creating an instance of [`Dispatcher`].
///
/// You only need to use this builder if you want to customize the dispatcher configuration.
/// The default configuration used by [`Dispatcher::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use signal_dispatch::Dispatcher;
///
/// let dispatcher = Dispatcher::<u32, String>::builder()
///     .name("ui-events")
///     .event_capacity(1024)
///     .build();
///
/// assert_eq!(dispatcher.name(), "ui-events");
/// ```
///
/// [1]: Dispatcher::new
#[must_use]
pub struct DispatcherBuilder<S, A, const CAPACITY: usize> {
    name: Option<String>,
    event_capacity: usize,

    _types: PhantomData<fn() -> (S, A)>,
}

impl<S, A, const CAPACITY: usize> fmt::Debug for DispatcherBuilder<S, A, CAPACITY> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("signal_type", &format_args!("{}", type_name::<S>()))
            .field("args_type", &format_args!("{}", type_name::<A>()))
            .field("name", &self.name)
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

impl<S, A, const CAPACITY: usize> DispatcherBuilder<S, A, CAPACITY>
where
    S: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    A: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            name: None,
            event_capacity: 0,
            _types: PhantomData,
        }
    }

    /// Sets the name that identifies the dispatcher in log messages.
    ///
    /// Default is "dispatcher".
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the number of events the queue has room for before it first needs to grow.
    ///
    /// The queue still grows beyond this on demand. Default is 0 (allocate on first push).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Builds the dispatcher with the specified configuration.
    #[must_use]
    pub fn build(self) -> Dispatcher<S, A, CAPACITY> {
        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());

        debug!(
            dispatcher = %name,
            signal_type = type_name::<S>(),
            args_type = type_name::<A>(),
            handler_capacity = CAPACITY,
            event_capacity = self.event_capacity,
            "created dispatcher"
        );

        Dispatcher::from_inner(DispatcherInner {
            name,
            registry: Mutex::new(HandlerRegistry::new()),
            queue: Mutex::new(EventQueue::with_capacity(self.event_capacity)),
            responding: AtomicBool::new(false),
        })
    }
}
