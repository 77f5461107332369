use std::fmt;

/// A signal type with a small, fixed number of values, usable with
/// [`FastDispatcher`][crate::fast::FastDispatcher].
///
/// The values must map to the contiguous index range `0..COUNT`. The fixed-capacity dispatcher
/// allocates one handler chain per index up front, so `COUNT` should be small.
///
/// # Example
///
/// ```rust
/// use signal_dispatch::fast::FixedSignal;
///
/// #[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// enum Operation {
///     Add,
///     Subtract,
/// }
///
/// impl FixedSignal for Operation {
///     const COUNT: usize = 2;
///
///     fn index(self) -> usize {
///         self as usize
///     }
/// }
///
/// assert_eq!(Operation::Subtract.index(), 1);
/// ```
pub trait FixedSignal: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// The number of distinct signal values.
    const COUNT: usize;

    /// The position of this value in `0..COUNT`.
    ///
    /// Values that report an index outside that range are rejected by the dispatcher with
    /// [`Error::SignalOutOfRange`][crate::Error::SignalOutOfRange].
    fn index(self) -> usize;
}
