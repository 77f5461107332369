use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fixed_collections::RingQueue;
use inline_fn::{Callable, DEFAULT_CAPACITY};
use tracing::{debug, trace};

use crate::fast::{FastDispatcherBuilder, FixedRegistry, FixedSignal, checked_index};
use crate::{Error, Event, EventBus, HandlerId, Result, SpinLock, bind};

pub(crate) struct FastInner<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize>
{
    pub(crate) name: String,
    pub(crate) registry: SpinLock<FixedRegistry<S, A, HANDLERS, CAPACITY>>,
    pub(crate) queue: SpinLock<RingQueue<Event<S, A>, EVENTS>>,

    // Set while a respond() call is draining the queue.
    pub(crate) responding: AtomicBool,
}

/// A publish/subscribe event dispatcher whose storage is allocated once, at construction.
///
/// Works like [`Dispatcher`][crate::Dispatcher], with these differences:
///
/// * Signals implement [`FixedSignal`], so each one maps to a preallocated handler chain.
/// * Each signal has room for at most `HANDLERS` handlers and the queue has room for at most
///   `EVENTS` events. Exceeding either limit is reported as an error instead of growing.
/// * [`respond()`][Self::respond] reports the number of events it delivered.
/// * Internal state is guarded by spin locks. Critical sections are a few slot reads or writes
///   and never include running a handler.
///
/// After construction, connecting handlers, pushing events and delivering them never allocates
/// memory (beyond what the argument type itself allocates when cloned).
///
/// # Example
///
/// ```rust
/// use signal_dispatch::fast::{FastDispatcher, FixedSignal};
///
/// #[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// enum Signal {
///     Tick,
/// }
///
/// impl FixedSignal for Signal {
///     const COUNT: usize = 1;
///
///     fn index(self) -> usize {
///         self as usize
///     }
/// }
///
/// let dispatcher = FastDispatcher::<Signal, u64, 4, 16>::new();
///
/// dispatcher.connect(Signal::Tick, |tick: u64| println!("tick {tick}")).unwrap();
/// dispatcher.push_event(Signal::Tick, 1).unwrap();
/// dispatcher.push_event(Signal::Tick, 2).unwrap();
///
/// assert_eq!(dispatcher.respond(0), 2);
/// ```
pub struct FastDispatcher<
    S,
    A,
    const HANDLERS: usize,
    const EVENTS: usize,
    const CAPACITY: usize = DEFAULT_CAPACITY,
> {
    inner: Arc<FastInner<S, A, HANDLERS, EVENTS, CAPACITY>>,
}

impl<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize>
    FastDispatcher<S, A, HANDLERS, EVENTS, CAPACITY>
where
    S: FixedSignal,
    A: Clone + Send + 'static,
{
    /// Creates a dispatcher with default settings, allocating all of its storage.
    ///
    /// Use [`FastDispatcher::builder()`] for custom configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring a dispatcher.
    #[must_use]
    pub fn builder() -> FastDispatcherBuilder<S, A, HANDLERS, EVENTS, CAPACITY> {
        FastDispatcherBuilder::new()
    }

    pub(crate) fn from_inner(inner: FastInner<S, A, HANDLERS, EVENTS, CAPACITY>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The name given to the dispatcher by its builder, used in log messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Connects a handler to the chain of `signal`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChainFull`] if `signal` already has `HANDLERS` handlers, or
    /// [`Error::SignalOutOfRange`] if `signal` reports an invalid index.
    pub fn connect<F>(&self, signal: S, handler: F) -> Result<HandlerId<S>>
    where
        F: Fn(A) + Clone + Send + Sync + 'static,
    {
        self.connect_callable(signal, Callable::from_closure(handler))
    }

    /// Connects a prebuilt [`Callable`] to the chain of `signal`.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_callable(
        &self,
        signal: S,
        handler: Callable<A, (), CAPACITY>,
    ) -> Result<HandlerId<S>> {
        let result = self.inner.registry.lock().connect(signal, handler);

        match &result {
            Ok(id) => trace!(
                dispatcher = %self.inner.name,
                ?signal,
                index = id.index(),
                "connected handler"
            ),
            Err(error) => debug!(
                dispatcher = %self.inner.name,
                ?signal,
                %error,
                "rejected handler"
            ),
        }

        result
    }

    /// Connects a handler that receives a reference to `bound` before the event arguments.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_bind<F, B>(&self, signal: S, handler: F, bound: B) -> Result<HandlerId<S>>
    where
        F: Fn(&B, A) + Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
    {
        self.connect_callable(signal, bind::with_bound(handler, bound))
    }

    /// Connects a method of a shared object. The handler keeps the object alive.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_member<T>(
        &self,
        signal: S,
        object: &Arc<T>,
        method: fn(&T, A),
    ) -> Result<HandlerId<S>>
    where
        T: Send + Sync + 'static,
    {
        self.connect_callable(signal, bind::shared_member(object, method))
    }

    /// Connects a method of an object that the dispatcher does not keep alive.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `object` points to a valid `T` that is not exclusively
    /// borrowed whenever the handler may be invoked, i.e. until the returned handler is
    /// disconnected and any in-progress delivery to it has returned.
    pub unsafe fn connect_member_raw<T>(
        &self,
        signal: S,
        object: NonNull<T>,
        method: fn(&T, A),
    ) -> Result<HandlerId<S>>
    where
        T: Sync + 'static,
    {
        // SAFETY: Forwarded to caller.
        let handler = unsafe { bind::raw_member(object, method) };

        self.connect_callable(signal, handler)
    }

    /// Connects a method of a shared object that receives a reference to `bound` before the
    /// event arguments. The handler keeps the object alive.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_bind_member<T, B>(
        &self,
        signal: S,
        object: &Arc<T>,
        method: fn(&T, &B, A),
        bound: B,
    ) -> Result<HandlerId<S>>
    where
        T: Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
    {
        self.connect_callable(signal, bind::bound_shared_member(object, method, bound))
    }

    /// Connects a function unless the same function is already connected to `signal`, in which
    /// case the identifier of the existing connection is returned.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_unique(&self, signal: S, handler: fn(A)) -> Result<HandlerId<S>> {
        let (id, added) = self
            .inner
            .registry
            .lock()
            .connect_unique(signal, Callable::from_fn(handler))?;

        if added {
            trace!(
                dispatcher = %self.inner.name,
                ?signal,
                index = id.index(),
                "connected handler"
            );
        } else {
            debug!(
                dispatcher = %self.inner.name,
                ?signal,
                index = id.index(),
                "handler already connected, not connecting again"
            );
        }

        Ok(id)
    }

    /// Disconnects a handler.
    ///
    /// Returns `false` without doing anything if the handler was already disconnected.
    pub fn disconnect(&self, id: HandlerId<S>) -> bool {
        let removed = self.inner.registry.lock().disconnect(id);

        trace!(
            dispatcher = %self.inner.name,
            signal = ?id.signal(),
            index = id.index(),
            removed,
            "disconnected handler"
        );

        removed
    }

    /// Disconnects every handler of `signal`. Returns how many there were.
    pub fn disconnect_all(&self, signal: S) -> usize {
        let removed = self.inner.registry.lock().disconnect_all(signal);

        trace!(
            dispatcher = %self.inner.name,
            ?signal,
            removed,
            "disconnected all handlers of signal"
        );

        removed
    }

    /// The number of handlers connected to `signal`.
    #[must_use]
    pub fn handler_count(&self, signal: S) -> usize {
        self.inner.registry.lock().handler_count(signal)
    }

    /// Adds an event to the back of the event queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] if `EVENTS` events are already queued, or
    /// [`Error::SignalOutOfRange`] if `signal` reports an invalid index. The event is discarded.
    pub fn push_event(&self, signal: S, args: A) -> Result<()> {
        checked_index(signal)?;

        let pushed = self.inner.queue.lock().push(Event::new(signal, args));

        if pushed.is_err() {
            debug!(
                dispatcher = %self.inner.name,
                ?signal,
                capacity = EVENTS,
                "event queue is full, rejected event"
            );

            return Err(Error::QueueFull { capacity: EVENTS });
        }

        trace!(dispatcher = %self.inner.name, ?signal, "pushed event");

        Ok(())
    }

    /// The number of events waiting in the queue.
    #[must_use]
    pub fn events_pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Delivers queued events in push order, each to every handler connected to its signal.
    ///
    /// At most `limit` events are delivered, and never more than were queued when the call
    /// started. A `limit` of 0 means no limit other than that. Events pushed during the call stay
    /// queued for the next call.
    ///
    /// Only one drain runs at a time. If another call to `respond()` is in progress, this call
    /// delivers nothing.
    ///
    /// Returns the number of events delivered.
    ///
    /// # Panics
    ///
    /// A panic in a handler propagates to the caller. The event being delivered is lost and the
    /// rest of the queue is intact.
    pub fn respond(&self, limit: usize) -> usize {
        if self
            .inner
            .responding
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!(
                dispatcher = %self.inner.name,
                "respond() is already in progress, ignoring nested or concurrent call"
            );
            return 0;
        }

        let _end_drain = scopeguard::guard((), |()| {
            self.inner.responding.store(false, Ordering::Release);
        });

        let available = self.events_pending();
        let budget = if limit == 0 {
            available
        } else {
            available.min(limit)
        };

        trace!(dispatcher = %self.inner.name, budget, "draining events");

        let mut delivered: usize = 0;

        for _ in 0..budget {
            // A handler may have purged the events we were going to deliver.
            let Some(event) = self.inner.queue.lock().pop() else {
                break;
            };

            self.deliver(event);
            delivered = delivered
                .checked_add(1)
                .expect("guarded by loop range, which is a usize");
        }

        trace!(dispatcher = %self.inner.name, delivered, "finished draining events");

        delivered
    }

    /// Removes every queued event for `signal` without delivering it. Returns how many there were.
    pub fn purge_events(&self, signal: S) -> usize {
        let purged = self
            .inner
            .queue
            .lock()
            .retain(|event| event.signal() != signal);

        trace!(dispatcher = %self.inner.name, ?signal, purged, "purged events");

        purged
    }

    /// Keeps only the queued events for which `keep` returns `true`, preserving their order.
    ///
    /// The visitor may modify the arguments of the events it keeps. Returns the number of events
    /// removed.
    ///
    /// The queue is locked while the visitor runs, so the visitor must not call back into this
    /// dispatcher's event operations (push, purge, respond); doing so never returns.
    pub fn retain_events<F>(&self, keep: F) -> usize
    where
        F: FnMut(&mut Event<S, A>) -> bool,
    {
        self.inner.queue.lock().retain(keep)
    }

    fn deliver(&self, event: Event<S, A>) {
        let (signal, args) = event.into_parts();

        for index in 0.. {
            let step = {
                let registry = self.inner.registry.lock();

                (index < registry.chain_len(signal)).then(|| registry.handler_at(signal, index))
            };

            match step {
                None => break,
                Some(None) => {}
                Some(Some(handler)) => handler.call(args.clone()),
            }
        }
    }
}

impl<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize> Clone
    for FastDispatcher<S, A, HANDLERS, EVENTS, CAPACITY>
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize> Default
    for FastDispatcher<S, A, HANDLERS, EVENTS, CAPACITY>
where
    S: FixedSignal,
    A: Clone + Send + 'static,
{
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize> fmt::Debug
    for FastDispatcher<S, A, HANDLERS, EVENTS, CAPACITY>
where
    S: FixedSignal,
{
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handler_count = self.inner.registry.lock().total_handler_count();
        let events_pending = self.inner.queue.lock().len();

        f.debug_struct(type_name::<Self>())
            .field("name", &self.inner.name)
            .field("handler_count", &handler_count)
            .field("events_pending", &events_pending)
            .finish_non_exhaustive()
    }
}

impl<S, A, const HANDLERS: usize, const EVENTS: usize, const CAPACITY: usize> EventBus
    for FastDispatcher<S, A, HANDLERS, EVENTS, CAPACITY>
where
    S: FixedSignal,
    A: Clone + Send + 'static,
{
    type Signal = S;
    type Args = A;

    fn connect<F>(&self, signal: S, handler: F) -> Result<HandlerId<S>>
    where
        F: Fn(A) + Clone + Send + Sync + 'static,
    {
        Self::connect(self, signal, handler)
    }

    fn disconnect(&self, id: HandlerId<S>) -> bool {
        Self::disconnect(self, id)
    }

    fn push_event(&self, signal: S, args: A) -> Result<()> {
        Self::push_event(self, signal, args)
    }

    fn respond(&self, limit: usize) -> usize {
        Self::respond(self, limit)
    }

    fn purge_events(&self, signal: S) -> usize {
        Self::purge_events(self, signal)
    }

    fn events_pending(&self) -> usize {
        Self::events_pending(self)
    }
}
