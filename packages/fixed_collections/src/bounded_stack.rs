use std::fmt;
use std::slice;

use crate::CapacityError;

/// A last-in-first-out stack with room for exactly `CAPACITY` items.
///
/// Storage for all items is allocated when the stack is created. Items are kept contiguous, so
/// the stack also works as a fixed-capacity vector with indexed access.
///
/// # Example
///
/// ```rust
/// use fixed_collections::BoundedStack;
///
/// let mut stack = BoundedStack::<u8, 2>::new();
///
/// stack.push(1).unwrap();
/// stack.push(2).unwrap();
/// assert!(stack.push(3).is_err());
///
/// assert_eq!(stack.pop(), Some(2));
/// assert_eq!(stack.top(), Some(&1));
/// ```
pub struct BoundedStack<T, const CAPACITY: usize> {
    // Never grows past CAPACITY, so the initial allocation is the only one.
    items: Vec<T>,
}

impl<T, const CAPACITY: usize> BoundedStack<T, CAPACITY> {
    /// Creates an empty stack, allocating storage for `CAPACITY` items.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(CAPACITY),
        }
    }

    /// The maximum number of items the stack can hold.
    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// The number of items on the stack.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the stack holds no items.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the stack has no room for another item.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= CAPACITY
    }

    /// Pushes an item on top of the stack.
    ///
    /// # Errors
    ///
    /// Returns the item inside a [`CapacityError`] if the stack is full.
    pub fn push(&mut self, value: T) -> Result<(), CapacityError<T>> {
        if self.is_full() {
            return Err(CapacityError::new(value, CAPACITY));
        }

        self.items.push(value);
        Ok(())
    }

    /// Removes and returns the top item.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// The top item (the next one [`pop()`][Self::pop] returns).
    #[must_use]
    pub fn top(&self) -> Option<&T> {
        self.items.last()
    }

    /// The item at `index`, counting from the bottom of the stack.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Mutable access to the item at `index`, counting from the bottom of the stack.
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Iterates over the items from bottom to top.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The items from bottom to top.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Removes all items, dropping them.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Removes every item that matches `predicate`, preserving the order of the rest.
    ///
    /// Returns the number of items removed.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let original_len = self.items.len();

        self.items.retain(|item| !predicate(item));

        original_len
            .checked_sub(self.items.len())
            .expect("retain() can only shrink the stack")
    }
}

impl<T, const CAPACITY: usize> Default for BoundedStack<T, CAPACITY> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, const CAPACITY: usize> fmt::Debug for BoundedStack<T, CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<'a, T, const CAPACITY: usize> IntoIterator for &'a BoundedStack<T, CAPACITY> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(BoundedStack<String, 4>: Send, Sync, Default, fmt::Debug);

    #[test]
    fn lifo_order() {
        let mut stack = BoundedStack::<u32, 3>::new();

        stack.push(1).unwrap();
        stack.push(2).unwrap();
        stack.push(3).unwrap();

        assert_eq!(stack.top(), Some(&3));
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn push_fails_when_full() {
        let mut stack = BoundedStack::<u32, 2>::new();

        stack.push(1).unwrap();
        stack.push(2).unwrap();

        assert!(stack.is_full());
        let error = stack.push(3).unwrap_err();
        assert_eq!(error.capacity(), 2);
        assert_eq!(error.into_inner(), 3);
        assert_eq!(stack.len(), 2);

        stack.pop();
        stack.push(4).unwrap();
        assert_eq!(stack.as_slice(), [1, 4]);
    }

    #[test]
    fn does_not_reallocate() {
        let mut stack = BoundedStack::<u64, 16>::new();
        let before = stack.as_slice().as_ptr();

        for value in 0..16 {
            stack.push(value).unwrap();
        }

        assert_eq!(stack.as_slice().as_ptr(), before);
    }

    #[test]
    fn indexed_access() {
        let mut stack = BoundedStack::<String, 3>::new();
        stack.push("a".to_string()).unwrap();
        stack.push("b".to_string()).unwrap();

        stack.get_mut(0).unwrap().push('!');

        assert_eq!(stack.get(0).map(String::as_str), Some("a!"));
        assert_eq!(stack.get(1).map(String::as_str), Some("b"));
        assert_eq!(stack.get(2), None);
    }

    #[test]
    fn remove_where_keeps_order() {
        let mut stack = BoundedStack::<u32, 8>::new();
        for value in 1..=8 {
            stack.push(value).unwrap();
        }

        let removed = stack.remove_where(|value| *value % 3 == 0);

        assert_eq!(removed, 2);
        assert_eq!(stack.iter().copied().collect::<Vec<_>>(), [1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn clear_empties() {
        let mut stack = BoundedStack::<u32, 2>::new();
        stack.push(1).unwrap();

        stack.clear();

        assert!(stack.is_empty());
        assert_eq!(stack.capacity(), 2);
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut stack = BoundedStack::<u32, 0>::new();

        assert!(stack.is_full());
        assert!(stack.push(1).is_err());
    }
}
