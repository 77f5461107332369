use std::fmt;

use crate::{HandlerId, Result};

/// The operations shared by both dispatcher flavors.
///
/// This is what [`Handles`][crate::Handles] is built on, so code that only connects handlers,
/// pushes events and drains them can be written once for [`Dispatcher`][crate::Dispatcher] and
/// [`FastDispatcher`][crate::fast::FastDispatcher].
///
/// Implementations are cheap handles to shared state: cloning a bus yields another handle to the
/// same handlers and the same event queue.
pub trait EventBus: Clone + Send + Sync + 'static {
    /// The value that selects a handler chain.
    type Signal: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    /// The arguments every handler of this bus receives.
    type Args: Clone + Send + 'static;

    /// Connects a handler to the chain of `signal`, behind every handler already connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChainFull`][crate::Error::ChainFull] if the bus has a fixed capacity and
    /// the chain is full.
    fn connect<F>(&self, signal: Self::Signal, handler: F) -> Result<HandlerId<Self::Signal>>
    where
        F: Fn(Self::Args) + Clone + Send + Sync + 'static;

    /// Disconnects a handler. Returns `false` if the identifier is stale or unknown.
    fn disconnect(&self, id: HandlerId<Self::Signal>) -> bool;

    /// Adds an event to the back of the event queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`][crate::Error::QueueFull] if the bus has a fixed capacity and
    /// the queue is full.
    fn push_event(&self, signal: Self::Signal, args: Self::Args) -> Result<()>;

    /// Delivers up to `limit` queued events (0 means every event queued when the call started).
    ///
    /// The meaning of the returned count depends on the flavor: the general-purpose dispatcher
    /// reports the events still pending, the fixed-capacity dispatcher the events processed.
    fn respond(&self, limit: usize) -> usize;

    /// Removes every queued event for `signal` without delivering it. Returns how many there were.
    fn purge_events(&self, signal: Self::Signal) -> usize;

    /// The number of events waiting in the queue.
    fn events_pending(&self) -> usize;
}
