use thiserror::Error;

/// A value could not be added because the container has no free slot.
///
/// The rejected value is handed back via [`into_inner()`][Self::into_inner].
#[derive(Debug, Error)]
#[error("container is full (capacity {capacity})")]
pub struct CapacityError<T> {
    value: T,
    capacity: usize,
}

impl<T> CapacityError<T> {
    pub(crate) const fn new(value: T, capacity: usize) -> Self {
        Self { value, capacity }
    }

    /// The fixed capacity of the container that rejected the value.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Takes back the value that could not be added.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}
