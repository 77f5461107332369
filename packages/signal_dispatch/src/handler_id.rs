/// Identifies one handler connection, for later removal via `disconnect()`.
///
/// An identifier stays valid for as long as the handler it names is connected, regardless of
/// other handlers being connected or disconnected around it. Once the handler is disconnected the
/// identifier becomes stale: disconnecting it again is a harmless no-op, even if a newer handler
/// has since been placed in the same slot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HandlerId<S> {
    signal: S,
    index: usize,
    generation: u64,
}

impl<S: Copy> HandlerId<S> {
    pub(crate) const fn new(signal: S, index: usize, generation: u64) -> Self {
        Self {
            signal,
            index,
            generation,
        }
    }

    /// The signal the handler is connected to.
    #[must_use]
    pub const fn signal(&self) -> S {
        self.signal
    }

    /// The position of the handler in the handler chain of its signal.
    ///
    /// Handlers are invoked in ascending position order. Positions freed by disconnected handlers
    /// are reused by later connections.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }
}
