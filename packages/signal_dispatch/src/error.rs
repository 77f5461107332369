use thiserror::Error;

/// Errors reported by the fixed-capacity dispatcher when one of its compile-time limits is
/// reached.
///
/// The general-purpose [`Dispatcher`][crate::Dispatcher] grows on demand and never returns these.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A handler could not be connected because the handler chain of its signal has no free slot.
    #[error("handler chain of signal #{signal_index} is full (capacity {capacity})")]
    ChainFull {
        /// The index of the signal, as reported by [`FixedSignal::index()`][crate::fast::FixedSignal::index].
        signal_index: usize,

        /// The maximum number of handlers per signal.
        capacity: usize,
    },

    /// An event could not be pushed because the event queue has no free slot.
    #[error("event queue is full (capacity {capacity})")]
    QueueFull {
        /// The maximum number of events that can be waiting in the queue.
        capacity: usize,
    },

    /// A signal reported an index outside the range declared by its type.
    #[error("signal index {index} is out of range (signal count {count})")]
    SignalOutOfRange {
        /// The index reported by the signal.
        index: usize,

        /// The number of signals declared by the signal type.
        count: usize,
    },
}

/// A specialized `Result` type for dispatcher operations, returning the crate's [`Error`] type as
/// the error value.
pub type Result<T> = std::result::Result<T, Error>;
