use thiserror::Error;

/// An empty [`Callable`][crate::Callable] was invoked.
///
/// Returned by [`Callable::try_call()`][crate::Callable::try_call]. Invoking an empty callable
/// through [`Callable::call()`][crate::Callable::call] panics with the same message instead.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("called an empty callable")]
#[non_exhaustive]
pub struct EmptyCallableError;
