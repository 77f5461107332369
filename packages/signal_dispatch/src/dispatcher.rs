use std::any::type_name;
use std::fmt;
use std::hash::Hash;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use inline_fn::{Callable, DEFAULT_CAPACITY};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    DispatcherBuilder, Event, EventAction, EventBus, EventQueue, HandlerId, HandlerRegistry,
    Result, bind,
};

pub(crate) struct DispatcherInner<S, A, const CAPACITY: usize> {
    pub(crate) name: String,
    pub(crate) registry: Mutex<HandlerRegistry<S, A, CAPACITY>>,
    pub(crate) queue: Mutex<EventQueue<S, A>>,

    // Set while a respond() call is draining the queue.
    pub(crate) responding: AtomicBool,
}

/// A publish/subscribe event dispatcher with growable storage.
///
/// Handlers are connected to signals of type `S` and receive arguments of type `A`. Events are
/// queued with [`push_event()`][Self::push_event] and later delivered, in push order, to every
/// handler connected to their signal by [`respond()`][Self::respond]. Use a tuple as `A` to pass
/// multiple arguments and `()` to pass none.
///
/// Handlers are stored as [`Callable`]s with `CAPACITY` bytes of inline storage, so connecting a
/// closure that captures more than that is a compile-time error.
///
/// # Sharing
///
/// The dispatcher is a handle to shared state. Clones refer to the same handlers and the same
/// event queue, and can be sent to other threads. All state is dropped when the last clone is.
///
/// # Argument passing
///
/// The arguments are moved into the queue when the event is pushed. Every handler receives its
/// own clone of them. If `A` contains shared references to mutable state (e.g. an `Arc` of an
/// atomic), handlers observe the state as it is when the event is delivered, not as it was when
/// the event was pushed.
///
/// # Reentrancy
///
/// Handlers may connect and disconnect handlers, push events and purge events on the dispatcher
/// that invokes them. Events pushed while a drain is in progress are left for the next call to
/// [`respond()`][Self::respond]. A handler disconnected while an event is being delivered is not
/// invoked for any chain position reached after it was disconnected.
///
/// # Example
///
/// ```rust
/// use signal_dispatch::Dispatcher;
///
/// #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
/// enum Signal {
///     Greet,
/// }
///
/// let dispatcher = Dispatcher::<Signal, String>::new();
///
/// dispatcher.connect(Signal::Greet, |name: String| println!("Hello, {name}!"));
///
/// dispatcher.push_event(Signal::Greet, "world".to_string());
/// let remaining = dispatcher.respond(0);
///
/// assert_eq!(remaining, 0);
/// ```
pub struct Dispatcher<S, A, const CAPACITY: usize = DEFAULT_CAPACITY> {
    inner: Arc<DispatcherInner<S, A, CAPACITY>>,
}

impl<S, A, const CAPACITY: usize> Dispatcher<S, A, CAPACITY>
where
    S: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    A: Clone + Send + 'static,
{
    /// Creates a dispatcher with default settings.
    ///
    /// Use [`Dispatcher::builder()`] for custom configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder<S, A, CAPACITY> {
        DispatcherBuilder::new()
    }

    pub(crate) fn from_inner(inner: DispatcherInner<S, A, CAPACITY>) -> Self {
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
    /// The handler is invoked after every handler connected to `signal` earlier (unless it reuses
    /// the position of a handler that has been disconnected, see [`HandlerId::index()`]).
    pub fn connect<F>(&self, signal: S, handler: F) -> HandlerId<S>
    where
        F: Fn(A) + Clone + Send + Sync + 'static,
    {
        self.connect_callable(signal, Callable::from_closure(handler))
    }

    /// Connects a prebuilt [`Callable`] to the chain of `signal`.
    ///
    /// # Panics
    ///
    /// Delivering an event to an empty callable panics.
    pub fn connect_callable(&self, signal: S, handler: Callable<A, (), CAPACITY>) -> HandlerId<S> {
        let id = self.inner.registry.lock().connect(signal, handler);

        trace!(
            dispatcher = %self.inner.name,
            ?signal,
            index = id.index(),
            "connected handler"
        );

        id
    }

    /// Connects a handler that receives a reference to `bound` before the event arguments.
    pub fn connect_bind<F, B>(&self, signal: S, handler: F, bound: B) -> HandlerId<S>
    where
        F: Fn(&B, A) + Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
    {
        self.connect_callable(signal, bind::with_bound(handler, bound))
    }

    /// Connects a method of a shared object. The handler keeps the object alive.
    pub fn connect_member<T>(&self, signal: S, object: &Arc<T>, method: fn(&T, A)) -> HandlerId<S>
    where
        T: Send + Sync + 'static,
    {
        self.connect_callable(signal, bind::shared_member(object, method))
    }

    /// Connects a method of an object that the dispatcher does not keep alive.
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
    ) -> HandlerId<S>
    where
        T: Sync + 'static,
    {
        // SAFETY: Forwarded to caller.
        let handler = unsafe { bind::raw_member(object, method) };

        self.connect_callable(signal, handler)
    }

    /// Connects a method of a shared object that receives a reference to `bound` before the
    /// event arguments. The handler keeps the object alive.
    pub fn connect_bind_member<T, B>(
        &self,
        signal: S,
        object: &Arc<T>,
        method: fn(&T, &B, A),
        bound: B,
    ) -> HandlerId<S>
    where
        T: Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
    {
        self.connect_callable(signal, bind::bound_shared_member(object, method, bound))
    }

    /// Connects a function unless the same function is already connected to `signal`, in which
    /// case the identifier of the existing connection is returned.
    pub fn connect_unique(&self, signal: S, handler: fn(A)) -> HandlerId<S> {
        let (id, added) = self
            .inner
            .registry
            .lock()
            .connect_unique(signal, Callable::from_fn(handler));

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

        id
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
    pub fn push_event(&self, signal: S, args: A) {
        let pending = {
            let mut queue = self.inner.queue.lock();
            queue.push(Event::new(signal, args));
            queue.len()
        };

        trace!(dispatcher = %self.inner.name, ?signal, pending, "pushed event");
    }

    /// The number of events waiting in the queue.
    ///
    /// Other threads may push events at any time, so this is only a snapshot.
    #[must_use]
    pub fn events_pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Delivers queued events in push order, each to every handler connected to its signal.
    ///
    /// At most `limit` events are delivered, and never more than were queued when the call
    /// started. A `limit` of 0 means no limit other than that. Events pushed during the call (by
    /// handlers or by other threads) stay queued for the next call.
    ///
    /// Only one drain runs at a time. If another call to `respond()` or
    /// [`respond_to()`][Self::respond_to] is in progress (on this thread, from a handler, or on
    /// another thread), this call delivers nothing.
    ///
    /// Returns the number of events still queued.
    ///
    /// # Panics
    ///
    /// A panic in a handler propagates to the caller. The event being delivered is lost and the
    /// handlers after the panicking one are not invoked for it. The rest of the queue is intact.
    pub fn respond(&self, limit: usize) -> usize {
        self.drain(None, limit)
    }

    /// Like [`respond()`][Self::respond] but only delivers events for `signal`.
    ///
    /// Events for other signals stay queued in their original order.
    ///
    /// Returns the number of events still queued, for all signals.
    pub fn respond_to(&self, signal: S, limit: usize) -> usize {
        self.drain(Some(signal), limit)
    }

    /// Removes every queued event for `signal` without delivering it. Returns how many there were.
    pub fn purge_events(&self, signal: S) -> usize {
        let purged = self.inner.queue.lock().purge(signal);

        trace!(dispatcher = %self.inner.name, ?signal, purged, "purged events");

        purged
    }

    /// Visits every queued event front to back, allowing the visitor to modify its arguments,
    /// remove it or copy it.
    ///
    /// Returns copies of the events for which the visitor returned [`EventAction::Copy`].
    ///
    /// The queue is locked while the visitor runs, so the visitor must not call back into this
    /// dispatcher's event operations (push, purge, respond); doing so deadlocks.
    pub fn update_events<F>(&self, visitor: F) -> Vec<Event<S, A>>
    where
        F: FnMut(&mut Event<S, A>) -> EventAction,
    {
        self.inner.queue.lock().update(visitor)
    }

    fn drain(&self, filter: Option<S>, limit: usize) -> usize {
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
            return self.events_pending();
        }

        let _end_drain = scopeguard::guard((), |()| {
            self.inner.responding.store(false, Ordering::Release);
        });

        let available = {
            let queue = self.inner.queue.lock();

            match filter {
                Some(signal) => queue.count_for(signal),
                None => queue.len(),
            }
        };

        let budget = if limit == 0 {
            available
        } else {
            available.min(limit)
        };

        trace!(dispatcher = %self.inner.name, ?filter, budget, "draining events");

        let mut delivered: usize = 0;

        for _ in 0..budget {
            let event = {
                let mut queue = self.inner.queue.lock();

                match filter {
                    Some(signal) => queue.pop_for(signal),
                    None => queue.pop(),
                }
            };

            // A handler may have purged the events we were going to deliver.
            let Some(event) = event else {
                break;
            };

            self.deliver(event);
            delivered = delivered
                .checked_add(1)
                .expect("guarded by loop range, which is a usize");
        }

        let remaining = self.events_pending();

        trace!(
            dispatcher = %self.inner.name,
            delivered,
            remaining,
            "finished draining events"
        );

        remaining
    }

    /// Invokes every handler of the event's signal.
    ///
    /// The registry lock is only held to copy out one handler at a time, never while a handler
    /// runs, so handlers are free to modify the registry.
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

impl<S, A, const CAPACITY: usize> Clone for Dispatcher<S, A, CAPACITY> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, const CAPACITY: usize> Default for Dispatcher<S, A, CAPACITY>
where
    S: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    A: Clone + Send + 'static,
{
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A, const CAPACITY: usize> fmt::Debug for Dispatcher<S, A, CAPACITY>
where
    S: Copy + Eq + Hash,
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

impl<S, A, const CAPACITY: usize> EventBus for Dispatcher<S, A, CAPACITY>
where
    S: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    A: Clone + Send + 'static,
{
    type Signal = S;
    type Args = A;

    fn connect<F>(&self, signal: S, handler: F) -> Result<HandlerId<S>>
    where
        F: Fn(A) + Clone + Send + Sync + 'static,
    {
        Ok(Self::connect(self, signal, handler))
    }

    fn disconnect(&self, id: HandlerId<S>) -> bool {
        Self::disconnect(self, id)
    }

    fn push_event(&self, signal: S, args: A) -> Result<()> {
        Self::push_event(self, signal, args);
        Ok(())
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
