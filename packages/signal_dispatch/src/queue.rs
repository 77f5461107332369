use std::collections::VecDeque;

/// A signal together with the arguments its handlers will be invoked with.
///
/// Events are created by `push_event()` and wait in the event queue of a dispatcher until
/// `respond()` delivers them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event<S, A> {
    signal: S,
    args: A,
}

impl<S: Copy, A> Event<S, A> {
    pub(crate) const fn new(signal: S, args: A) -> Self {
        Self { signal, args }
    }

    /// The signal that selects which handler chain receives the event.
    #[must_use]
    pub const fn signal(&self) -> S {
        self.signal
    }

    /// The arguments captured when the event was pushed.
    #[must_use]
    pub const fn args(&self) -> &A {
        &self.args
    }

    /// Mutable access to the arguments, for rewriting events that are still queued.
    #[must_use]
    pub fn args_mut(&mut self) -> &mut A {
        &mut self.args
    }

    /// Splits the event into its signal and arguments.
    #[must_use]
    pub fn into_parts(self) -> (S, A) {
        (self.signal, self.args)
    }
}

/// What `update_events()` does with each queued event after the visitor has seen it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum EventAction {
    /// Leave the (possibly modified) event in the queue.
    Keep,

    /// Take the event out of the queue without delivering it.
    Remove,

    /// Leave the event in the queue and also return a copy of it to the caller.
    Copy,
}

/// FIFO storage for pending events of the general-purpose dispatcher.
#[derive(Debug)]
pub(crate) struct EventQueue<S, A> {
    events: VecDeque<Event<S, A>>,
}

impl<S, A> EventQueue<S, A>
where
    S: Copy + Eq,
{
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn push(&mut self, event: Event<S, A>) {
        self.events.push_back(event);
    }

    pub(crate) fn pop(&mut self) -> Option<Event<S, A>> {
        self.events.pop_front()
    }

    pub(crate) fn count_for(&self, signal: S) -> usize {
        self.events
            .iter()
            .filter(|event| event.signal == signal)
            .count()
    }

    /// Removes the oldest event for `signal`, leaving the order of the others unchanged.
    pub(crate) fn pop_for(&mut self, signal: S) -> Option<Event<S, A>> {
        let position = self
            .events
            .iter()
            .position(|event| event.signal == signal)?;

        self.events.remove(position)
    }

    /// Removes every event for `signal`. Returns how many were removed.
    pub(crate) fn purge(&mut self, signal: S) -> usize {
        let before = self.events.len();

        self.events.retain(|event| event.signal != signal);

        before
            .checked_sub(self.events.len())
            .expect("retain() can only shrink the queue")
    }

    /// Visits every event front to back and applies the action the visitor picks for it.
    ///
    /// Returns copies of the events marked with [`EventAction::Copy`], in queue order.
    pub(crate) fn update<F>(&mut self, mut visitor: F) -> Vec<Event<S, A>>
    where
        F: FnMut(&mut Event<S, A>) -> EventAction,
        A: Clone,
    {
        let mut copies = Vec::new();

        self.events.retain_mut(|event| match visitor(event) {
            EventAction::Keep => true,
            EventAction::Remove => false,
            EventAction::Copy => {
                copies.push(event.clone());
                true
            }
        });

        copies
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Event<u8, String>: Send, Sync, Clone, std::fmt::Debug);

    fn queue_of(events: &[(char, u32)]) -> EventQueue<char, u32> {
        let mut queue = EventQueue::with_capacity(events.len());

        for (signal, args) in events {
            queue.push(Event::new(*signal, *args));
        }

        queue
    }

    fn drain(queue: &mut EventQueue<char, u32>) -> Vec<(char, u32)> {
        std::iter::from_fn(|| queue.pop())
            .map(Event::into_parts)
            .collect()
    }

    #[test]
    fn pop_for_preserves_order_of_others() {
        let mut queue = queue_of(&[('a', 1), ('b', 2), ('a', 3), ('b', 4)]);

        assert_eq!(queue.count_for('b'), 2);
        assert_eq!(queue.pop_for('b').map(Event::into_parts), Some(('b', 2)));
        assert_eq!(queue.pop_for('c'), None);

        assert_eq!(drain(&mut queue), [('a', 1), ('a', 3), ('b', 4)]);
    }

    #[test]
    fn purge_removes_only_matching() {
        let mut queue = queue_of(&[('a', 1), ('b', 2), ('a', 3), ('a', 4), ('b', 5)]);

        assert_eq!(queue.purge('a'), 3);
        assert_eq!(queue.purge('a'), 0);

        assert_eq!(drain(&mut queue), [('b', 2), ('b', 5)]);
    }

    #[test]
    fn update_applies_actions() {
        let mut queue = queue_of(&[('a', 1), ('b', 2), ('c', 3)]);

        let copies = queue.update(|event| match event.signal() {
            'a' => {
                *event.args_mut() += 10;
                EventAction::Keep
            }
            'b' => EventAction::Remove,
            _ => EventAction::Copy,
        });

        assert_eq!(copies, [Event::new('c', 3)]);
        assert_eq!(queue.len(), 2);
        assert_eq!(drain(&mut queue), [('a', 11), ('c', 3)]);
    }

    #[test]
    fn event_accessors() {
        let mut event = Event::new(7_u8, "args".to_string());

        assert_eq!(event.signal(), 7);
        assert_eq!(event.args(), "args");

        event.args_mut().push('!');

        assert_eq!(event.into_parts(), (7, "args!".to_string()));
    }
}
