use std::fmt;
use std::iter::{self, FusedIterator};

use crate::CapacityError;

/// A first-in-first-out queue with room for exactly `CAPACITY` items.
///
/// The slots are allocated once, when the queue is created. Items are stored in a circular layout:
/// pushing writes behind the logical back and popping frees the logical front, so a slot freed by
/// a pop is reused by a later push without shifting any items.
///
/// # Example
///
/// ```rust
/// use fixed_collections::RingQueue;
///
/// let mut queue = RingQueue::<&str, 4>::new();
///
/// queue.push("a").unwrap();
/// queue.push("b").unwrap();
///
/// assert_eq!(queue.front(), Some(&"a"));
/// assert_eq!(queue.pop(), Some("a"));
/// assert_eq!(queue.len(), 1);
/// ```
pub struct RingQueue<T, const CAPACITY: usize> {
    slots: Box<[Option<T>]>,

    // Physical index of the logical front. Always less than CAPACITY (or zero if CAPACITY is zero).
    head: usize,

    len: usize,
}

impl<T, const CAPACITY: usize> RingQueue<T, CAPACITY> {
    /// Creates an empty queue, allocating storage for `CAPACITY` items.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: iter::repeat_with(|| None).take(CAPACITY).collect(),
            head: 0,
            len: 0,
        }
    }

    /// The maximum number of items the queue can hold.
    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// The number of items in the queue.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the queue holds no items.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every slot of the queue is occupied.
    #[must_use]
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len >= CAPACITY
    }

    /// Appends an item to the back of the queue.
    ///
    /// # Errors
    ///
    /// Returns the item inside a [`CapacityError`] if the queue is full.
    pub fn push(&mut self, value: T) -> Result<(), CapacityError<T>> {
        if self.is_full() {
            return Err(CapacityError::new(value, CAPACITY));
        }

        let index = self.slot_index(self.len);

        let slot = self
            .slots
            .get_mut(index)
            .expect("slot_index() only returns in-bounds indexes");
        debug_assert!(slot.is_none(), "slot behind the back of the queue was occupied");
        *slot = Some(value);

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by is_full() check above");

        Ok(())
    }

    /// Removes and returns the item at the front of the queue.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let value = self
            .slots
            .get_mut(self.head)
            .expect("head is in bounds whenever the queue is not empty")
            .take();
        debug_assert!(value.is_some(), "front slot of a non-empty queue was vacant");

        self.head = self.slot_index(1);
        self.len = self
            .len
            .checked_sub(1)
            .expect("guarded by is_empty() check above");

        value
    }

    /// The item at the front of the queue (the next one [`pop()`][Self::pop] returns).
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// The item at the back of the queue (the most recently pushed one).
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// The item at logical position `index`, counting from the front.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        self.slots.get(self.slot_index(index)).and_then(Option::as_ref)
    }

    /// Mutable access to the item at logical position `index`, counting from the front.
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }

        let index = self.slot_index(index);
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Iterates over the items from front to back.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T, CAPACITY> {
        Iter {
            queue: self,
            front: 0,
            back: self.len,
        }
    }

    /// Removes all items, dropping them.
    pub fn clear(&mut self) {
        self.slots.fill_with(|| None);

        self.head = 0;
        self.len = 0;
    }

    /// Keeps only the items for which `keep` returns `true`, preserving their order.
    ///
    /// The predicate receives mutable access and may modify items it keeps.
    ///
    /// Returns the number of items removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&mut T) -> bool,
    {
        let original_len = self.len;

        // Kept items are compacted towards the front in place. The compactor closes the gap when
        // dropped, including on unwind out of `keep` or out of a removed item's drop glue.
        let mut compactor = Compactor {
            queue: self,
            read: 0,
            write: 0,
            original_len,
        };

        while compactor.read < original_len {
            let index = compactor.queue.slot_index(compactor.read);
            let slot = compactor
                .queue
                .slots
                .get_mut(index)
                .expect("slot_index() only returns in-bounds indexes");
            let item = slot
                .as_mut()
                .expect("every slot between the front and the back is occupied");

            let next_read = compactor
                .read
                .checked_add(1)
                .expect("guarded by loop condition, read is below the original length");

            if keep(item) {
                compactor.queue.move_item(compactor.read, compactor.write);
                compactor.write = compactor
                    .write
                    .checked_add(1)
                    .expect("write never passes read");
                compactor.read = next_read;
            } else {
                let removed = slot.take();
                compactor.read = next_read;
                drop(removed);
            }
        }

        let kept = compactor.write;
        drop(compactor);

        original_len
            .checked_sub(kept)
            .expect("retain() can only shrink the queue")
    }

    /// Removes and returns the first item (front to back) that matches `predicate`.
    ///
    /// The items behind it move forward by one position, keeping their order.
    pub fn remove_first<F>(&mut self, mut predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let position = self.iter().position(&mut predicate)?;

        let removed_index = self.slot_index(position);
        let removed = self
            .slots
            .get_mut(removed_index)
            .expect("slot_index() only returns in-bounds indexes")
            .take();

        let last = self
            .len
            .checked_sub(1)
            .expect("we found an item, so the queue is not empty");

        for logical in position..last {
            self.move_item(
                logical
                    .checked_add(1)
                    .expect("guarded by loop range, which ends below len"),
                logical,
            );
        }

        self.len = last;

        removed
    }

    /// Moves the item at logical position `from` into the vacant logical position `to`.
    fn move_item(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }

        let from = self.slot_index(from);
        let to = self.slot_index(to);

        let moved = self
            .slots
            .get_mut(from)
            .expect("slot_index() only returns in-bounds indexes")
            .take();

        let target = self
            .slots
            .get_mut(to)
            .expect("slot_index() only returns in-bounds indexes");
        debug_assert!(target.is_none(), "moved an item onto an occupied slot");
        *target = moved;
    }

    /// Translates a logical position (0 = front) into a physical slot index.
    fn slot_index(&self, logical: usize) -> usize {
        debug_assert!(logical <= CAPACITY);

        // Both operands are at most CAPACITY and the slots are allocated,
        // so the sum fits in usize.
        let raw = self.head.wrapping_add(logical);

        if raw >= CAPACITY {
            raw.wrapping_sub(CAPACITY)
        } else {
            raw
        }
    }
}

/// In-progress state of [`RingQueue::retain()`].
///
/// Logical positions below `write` hold kept items, positions from `read` up to `original_len`
/// hold items not yet (or not fully) visited and everything in between is vacant.
struct Compactor<'a, T, const CAPACITY: usize> {
    queue: &'a mut RingQueue<T, CAPACITY>,
    read: usize,
    write: usize,
    original_len: usize,
}

impl<T, const CAPACITY: usize> Drop for Compactor<'_, T, CAPACITY> {
    fn drop(&mut self) {
        let unvisited = self
            .original_len
            .checked_sub(self.read)
            .expect("read never passes the original length");

        for offset in 0..unvisited {
            let from = self
                .read
                .checked_add(offset)
                .expect("guarded by loop range, which ends at the original length");
            let to = self
                .write
                .checked_add(offset)
                .expect("write never passes read");

            self.queue.move_item(from, to);
        }

        self.queue.len = self
            .write
            .checked_add(unvisited)
            .expect("the queue can only shrink");
    }
}

impl<T, const CAPACITY: usize> Default for RingQueue<T, CAPACITY> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, const CAPACITY: usize> fmt::Debug for RingQueue<T, CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, const CAPACITY: usize> IntoIterator for &'a RingQueue<T, CAPACITY> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, CAPACITY>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the items of a [`RingQueue`], front to back.
#[derive(Debug)]
pub struct Iter<'a, T, const CAPACITY: usize> {
    queue: &'a RingQueue<T, CAPACITY>,

    // Logical range of items not yet yielded.
    front: usize,
    back: usize,
}

impl<'a, T, const CAPACITY: usize> Iterator for Iter<'a, T, CAPACITY> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }

        let item = self.queue.get(self.front);
        self.front = self
            .front
            .checked_add(1)
            .expect("guarded by front < back check above");
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back.saturating_sub(self.front);
        (remaining, Some(remaining))
    }
}

impl<T, const CAPACITY: usize> DoubleEndedIterator for Iter<'_, T, CAPACITY> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }

        self.back = self
            .back
            .checked_sub(1)
            .expect("guarded by front < back check above");
        self.queue.get(self.back)
    }
}

impl<T, const CAPACITY: usize> ExactSizeIterator for Iter<'_, T, CAPACITY> {}

impl<T, const CAPACITY: usize> FusedIterator for Iter<'_, T, CAPACITY> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(RingQueue<String, 4>: Send, Sync, Default, fmt::Debug);

    fn contents<const CAPACITY: usize>(queue: &RingQueue<u32, CAPACITY>) -> Vec<u32> {
        queue.iter().copied().collect()
    }

    #[test]
    fn starts_empty() {
        let queue = RingQueue::<u32, 3>::new();

        assert!(queue.is_empty());
        assert!(!queue.is_full());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.capacity(), 3);
        assert_eq!(queue.front(), None);
        assert_eq!(queue.back(), None);
    }

    #[test]
    fn fifo_order() {
        let mut queue = RingQueue::<u32, 4>::new();

        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.push(3).unwrap();

        assert_eq!(queue.front(), Some(&1));
        assert_eq!(queue.back(), Some(&3));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_fails_when_full_then_wraps_after_pop() {
        let mut queue = RingQueue::<u32, 3>::new();

        for value in 0..3 {
            queue.push(value).unwrap();
        }

        assert!(queue.is_full());

        let error = queue.push(99).unwrap_err();
        assert_eq!(error.capacity(), 3);
        assert_eq!(error.into_inner(), 99);
        assert_eq!(contents(&queue), [0, 1, 2]);

        assert_eq!(queue.pop(), Some(0));
        queue.push(3).unwrap();

        assert!(queue.is_full());
        assert_eq!(contents(&queue), [1, 2, 3]);
        assert_eq!(queue.get(2), Some(&3));
        assert_eq!(queue.get(3), None);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let mut queue = RingQueue::<u32, 0>::new();

        assert!(queue.is_full());
        assert!(queue.push(1).is_err());
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.retain(|_| true), 0);
    }

    #[test]
    fn many_wraparounds_keep_order() {
        let mut queue = RingQueue::<u32, 3>::new();
        let mut expected = 0;

        for value in 0..100 {
            queue.push(value).unwrap();

            if queue.is_full() {
                assert_eq!(queue.pop(), Some(expected));
                expected += 1;
            }
        }

        while let Some(value) = queue.pop() {
            assert_eq!(value, expected);
            expected += 1;
        }

        assert_eq!(expected, 100);
    }

    #[test]
    fn iter_is_double_ended_and_exact() {
        let mut queue = RingQueue::<u32, 4>::new();

        // Force a wrapped layout.
        queue.push(0).unwrap();
        queue.push(0).unwrap();
        queue.pop();
        queue.pop();
        for value in 1..=4 {
            queue.push(value).unwrap();
        }

        let iter = queue.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.rev().copied().collect::<Vec<_>>(), [4, 3, 2, 1]);

        let mut seen = Vec::new();
        for value in &queue {
            seen.push(*value);
        }
        assert_eq!(seen, [1, 2, 3, 4]);
    }

    #[test]
    fn get_mut_modifies_in_place() {
        let mut queue = RingQueue::<u32, 2>::new();
        queue.push(10).unwrap();

        *queue.get_mut(0).unwrap() += 5;

        assert_eq!(queue.pop(), Some(15));
        assert!(queue.get_mut(0).is_none());
    }

    #[test]
    fn retain_preserves_order_of_kept_items() {
        let mut queue = RingQueue::<u32, 6>::new();

        queue.push(100).unwrap();
        queue.pop();
        for value in [1, 2, 3, 4, 5, 6] {
            queue.push(value).unwrap();
        }

        let removed = queue.retain(|value| *value % 2 == 0);

        assert_eq!(removed, 3);
        assert_eq!(contents(&queue), [2, 4, 6]);

        // The freed slots are usable again.
        for value in [7, 8, 9] {
            queue.push(value).unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(contents(&queue), [2, 4, 6, 7, 8, 9]);
    }

    #[test]
    fn retain_can_modify_kept_items() {
        let mut queue = RingQueue::<u32, 3>::new();
        queue.push(1).unwrap();
        queue.push(2).unwrap();

        let removed = queue.retain(|value| {
            *value *= 10;
            true
        });

        assert_eq!(removed, 0);
        assert_eq!(contents(&queue), [10, 20]);
    }

    #[test]
    fn retain_keeps_order_when_predicate_panics() {
        let mut queue = RingQueue::<u32, 4>::new();
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.push(3).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            queue.retain(|value| {
                assert_ne!(*value, 2);
                true
            })
        }));

        assert!(result.is_err());
        assert_eq!(queue.len(), 3);
        assert_eq!(contents(&queue), [1, 2, 3]);
    }

    #[test]
    fn retain_closes_gap_when_predicate_panics_after_removal() {
        let mut queue = RingQueue::<u32, 5>::new();

        // Start near the end of the slots so that the items wrap around.
        for _ in 0..3 {
            queue.push(0).unwrap();
            queue.pop();
        }
        for value in [1, 2, 3, 4, 5] {
            queue.push(value).unwrap();
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            queue.retain(|value| {
                assert_ne!(*value, 4);
                *value != 2
            })
        }));

        assert!(result.is_err());
        assert_eq!(contents(&queue), [1, 3, 4, 5]);

        queue.push(6).unwrap();
        assert!(queue.is_full());
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(contents(&queue), [3, 4, 5, 6]);
    }

    #[test]
    fn remove_first_shifts_later_items_forward() {
        let mut queue = RingQueue::<u32, 5>::new();

        queue.push(0).unwrap();
        queue.push(0).unwrap();
        queue.pop();
        queue.pop();
        for value in [1, 2, 3, 2, 5] {
            queue.push(value).unwrap();
        }

        assert_eq!(queue.remove_first(|value| *value == 2), Some(2));
        assert_eq!(contents(&queue), [1, 3, 2, 5]);

        assert_eq!(queue.remove_first(|value| *value == 5), Some(5));
        assert_eq!(contents(&queue), [1, 3, 2]);

        assert_eq!(queue.remove_first(|value| *value == 42), None);
        assert_eq!(queue.len(), 3);

        queue.push(6).unwrap();
        queue.push(7).unwrap();
        assert_eq!(contents(&queue), [1, 3, 2, 6, 7]);
    }

    #[test]
    fn clear_drops_items() {
        let tracker = Arc::new(());
        let mut queue = RingQueue::<Arc<()>, 3>::new();

        queue.push(Arc::clone(&tracker)).unwrap();
        queue.push(Arc::clone(&tracker)).unwrap();
        assert_eq!(Arc::strong_count(&tracker), 3);

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(Arc::strong_count(&tracker), 1);
        queue.push(Arc::clone(&tracker)).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drop_releases_items() {
        let tracker = Arc::new(());

        {
            let mut queue = RingQueue::<Arc<()>, 2>::new();
            queue.push(Arc::clone(&tracker)).unwrap();
        }

        assert_eq!(Arc::strong_count(&tracker), 1);
    }

    #[test]
    fn debug_lists_items_in_order() {
        let mut queue = RingQueue::<u32, 3>::new();
        queue.push(1).unwrap();
        queue.push(2).unwrap();

        assert_eq!(format!("{queue:?}"), "[1, 2]");
    }
}
