//! A dispatcher flavor with storage fixed at construction.
//!
//! [`FastDispatcher`] trades the open-ended capacity of [`Dispatcher`][crate::Dispatcher] for
//! predictable memory use: signals are small dense indexes ([`FixedSignal`]), each signal has a
//! preallocated chain of `HANDLERS` handler slots and the event queue is a ring of `EVENTS`
//! slots. Exceeding a limit is an [`Error`][crate::Error], not an allocation.

mod builder;
mod chain;
mod dispatcher;
mod signal;

pub use builder::*;
pub(crate) use chain::*;
pub use dispatcher::*;
pub use signal::*;
