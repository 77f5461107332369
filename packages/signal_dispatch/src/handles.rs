use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::{EventBus, HandlerId, Result, bind};

/// Owns a set of handler connections on an [`EventBus`] and disconnects them when dropped.
///
/// Embed a `Handles` in an object that reacts to events and connect the object's handlers through
/// it. When the object is dropped, its handlers are disconnected along with it, so the bus never
/// calls into an object that no longer exists.
///
/// Members connected via [`connect_member()`][Self::connect_member] are captured weakly, so an
/// object stored in an [`Arc`] can own the `Handles` that refer back to it without keeping itself
/// alive.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// use signal_dispatch::{Dispatcher, Handles};
///
/// #[derive(Default)]
/// struct Totals {
///     sum: AtomicU64,
/// }
///
/// impl Totals {
///     fn add(&self, value: u64) {
///         self.sum.fetch_add(value, Ordering::Relaxed);
///     }
/// }
///
/// let dispatcher = Dispatcher::<&'static str, u64>::new();
/// let totals = Arc::new(Totals::default());
///
/// let mut handles = Handles::new(dispatcher.clone());
/// handles.connect_member("add", &totals, Totals::add).unwrap();
///
/// dispatcher.push_event("add", 5);
/// dispatcher.respond(0);
/// assert_eq!(totals.sum.load(Ordering::Relaxed), 5);
///
/// drop(handles);
/// assert_eq!(dispatcher.handler_count("add"), 0);
/// ```
pub struct Handles<B: EventBus> {
    bus: B,
    ids: Vec<HandlerId<B::Signal>>,
}

impl<B: EventBus> Handles<B> {
    /// Creates an empty set of connections on `bus`.
    #[must_use]
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            ids: Vec::new(),
        }
    }

    /// The bus the connections are made on.
    #[must_use]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The identifiers of the connections this instance still owns.
    #[must_use]
    pub fn ids(&self) -> &[HandlerId<B::Signal>] {
        &self.ids
    }

    /// The number of connections this instance still owns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether this instance owns no connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Connects a handler and records the connection.
    ///
    /// # Errors
    ///
    /// Forwards the error of [`EventBus::connect()`], in which case nothing is recorded.
    pub fn connect<F>(&mut self, signal: B::Signal, handler: F) -> Result<HandlerId<B::Signal>>
    where
        F: Fn(B::Args) + Clone + Send + Sync + 'static,
    {
        let id = self.bus.connect(signal, handler)?;
        self.ids.push(id);

        Ok(id)
    }

    /// Connects a handler that receives a reference to `bound` before the event arguments.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_bind<F, V>(
        &mut self,
        signal: B::Signal,
        handler: F,
        bound: V,
    ) -> Result<HandlerId<B::Signal>>
    where
        F: Fn(&V, B::Args) + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.connect(signal, move |args| handler(&bound, args))
    }

    /// Connects a method of a shared object without keeping the object alive.
    ///
    /// Once the last strong reference to the object is gone, the handler does nothing.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_member<T>(
        &mut self,
        signal: B::Signal,
        object: &Arc<T>,
        method: fn(&T, B::Args),
    ) -> Result<HandlerId<B::Signal>>
    where
        T: Send + Sync + 'static,
    {
        self.connect(signal, bind::weak_member(object, method))
    }

    /// Like [`connect_member()`][Self::connect_member] but passing `bound` ahead of the event
    /// arguments.
    ///
    /// # Errors
    ///
    /// Same as [`connect()`][Self::connect].
    pub fn connect_bind_member<T, V>(
        &mut self,
        signal: B::Signal,
        object: &Arc<T>,
        method: fn(&T, &V, B::Args),
        bound: V,
    ) -> Result<HandlerId<B::Signal>>
    where
        T: Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.connect(signal, bind::bound_weak_member(object, method, bound))
    }

    /// Disconnects one of the connections this instance owns.
    ///
    /// Returns `false` if `id` was not created through this instance or was already disconnected.
    pub fn disconnect(&mut self, id: HandlerId<B::Signal>) -> bool {
        let Some(position) = self.ids.iter().position(|owned| *owned == id) else {
            return false;
        };

        self.ids.swap_remove(position);
        self.bus.disconnect(id)
    }

    /// Adds an event to the back of the bus's event queue.
    ///
    /// # Errors
    ///
    /// Forwards the error of [`EventBus::push_event()`].
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn push_event(&self, signal: B::Signal, args: B::Args) -> Result<()> {
        self.bus.push_event(signal, args)
    }

    /// Delivers queued events. See [`EventBus::respond()`].
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn respond(&self, limit: usize) -> usize {
        self.bus.respond(limit)
    }

    /// Removes every queued event for `signal`. See [`EventBus::purge_events()`].
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn purge_events(&self, signal: B::Signal) -> usize {
        self.bus.purge_events(signal)
    }

    /// Disconnects every connection this instance owns. Returns how many were still connected.
    ///
    /// The instance remains usable for new connections.
    pub fn close(&mut self) -> usize {
        let owned = self.ids.len();

        let disconnected = self
            .ids
            .drain(..)
            .filter(|id| self.bus.disconnect(*id))
            .count();

        trace!(
            bus = type_name::<B>(),
            owned, disconnected, "closed handler connections"
        );

        disconnected
    }
}

impl<B: EventBus> Drop for Handles<B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<B> fmt::Debug for Handles<B>
where
    B: EventBus + fmt::Debug,
{
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("bus", &self.bus)
            .field("ids", &self.ids)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use testing::Recorder;

    use super::*;
    use crate::Dispatcher;
    use crate::fast::{FastDispatcher, FixedSignal};

    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
    }

    impl Counter {
        fn bump(&self, amount: usize) {
            self.calls.fetch_add(amount, Ordering::Relaxed);
        }

        fn bump_scaled(&self, scale: &usize, amount: usize) {
            self.calls.fetch_add(scale * amount, Ordering::Relaxed);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum Slot {
        Only,
    }

    impl FixedSignal for Slot {
        const COUNT: usize = 1;

        fn index(self) -> usize {
            self as usize
        }
    }

    #[test]
    fn drop_disconnects_everything() {
        let dispatcher = Dispatcher::<u8, usize>::new();
        let recorder = Recorder::new();

        {
            let mut handles = Handles::new(dispatcher.clone());

            handles
                .connect(1, {
                    let recorder = recorder.clone();
                    move |value| recorder.record(value)
                })
                .unwrap();
            handles
                .connect_bind(
                    2,
                    {
                        let recorder = recorder.clone();
                        move |offset: &usize, value| recorder.record(offset + value)
                    },
                    100,
                )
                .unwrap();

            assert_eq!(handles.len(), 2);
            assert_eq!(dispatcher.handler_count(1), 1);

            handles.push_event(1, 1).unwrap();
            handles.push_event(2, 2).unwrap();
            handles.respond(0);
        }

        assert_eq!(dispatcher.handler_count(1), 0);
        assert_eq!(dispatcher.handler_count(2), 0);
        assert_eq!(recorder.take(), [1, 102]);
    }

    #[test]
    fn member_is_held_weakly() {
        let dispatcher = Dispatcher::<u8, usize>::new();
        let counter = Arc::new(Counter::default());
        let mut handles = Handles::new(dispatcher.clone());

        handles.connect_member(0, &counter, Counter::bump).unwrap();
        handles
            .connect_bind_member(0, &counter, Counter::bump_scaled, 10)
            .unwrap();

        assert_eq!(Arc::strong_count(&counter), 1);

        dispatcher.push_event(0, 1);
        dispatcher.respond(0);
        assert_eq!(counter.calls(), 11);

        drop(counter);

        // Still connected, but the object is gone.
        dispatcher.push_event(0, 1);
        dispatcher.respond(0);
        assert_eq!(dispatcher.handler_count(0), 2);
    }

    #[test]
    fn close_is_idempotent_and_reusable() {
        let dispatcher = Dispatcher::<u8, ()>::new();
        let mut handles = Handles::new(dispatcher.clone());

        let id = handles.connect(3, |()| {}).unwrap();
        handles.connect(3, |()| {}).unwrap();

        // Disconnected behind the back of the handles.
        assert!(dispatcher.disconnect(id));

        assert_eq!(handles.close(), 1);
        assert_eq!(handles.close(), 0);
        assert!(handles.is_empty());

        handles.connect(3, |()| {}).unwrap();
        assert_eq!(dispatcher.handler_count(3), 1);
    }

    #[test]
    fn disconnect_only_owned_ids() {
        let dispatcher = Dispatcher::<u8, ()>::new();
        let foreign = dispatcher.connect(0, |()| {});
        let mut handles = Handles::new(dispatcher.clone());

        let owned = handles.connect(0, |()| {}).unwrap();

        assert!(!handles.disconnect(foreign));
        assert!(handles.disconnect(owned));
        assert!(!handles.disconnect(owned));
        assert_eq!(dispatcher.handler_count(0), 1);
    }

    #[test]
    fn works_with_fast_dispatcher() {
        let dispatcher = FastDispatcher::<Slot, usize, 1, 4>::new();
        let counter = Arc::new(Counter::default());

        {
            let mut handles = Handles::new(dispatcher.clone());
            handles
                .connect_member(Slot::Only, &counter, Counter::bump)
                .unwrap();

            // The chain holds a single handler.
            assert!(handles.connect(Slot::Only, |_| {}).is_err());
            assert_eq!(handles.len(), 1);

            handles.push_event(Slot::Only, 3).unwrap();
            assert_eq!(handles.respond(0), 1);
        }

        assert_eq!(counter.calls(), 3);
        assert_eq!(dispatcher.handler_count(Slot::Only), 0);
    }
}
