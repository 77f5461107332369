use std::marker::PhantomData;
use std::{iter, result};

use fixed_collections::BoundedStack;
use inline_fn::Callable;

use crate::fast::FixedSignal;
use crate::registry::Slot;
use crate::{Error, HandlerId, Result};

/// The handlers connected to one signal, stored in a fixed number of slots.
///
/// Positions behave like those of the growable handler chain: vacant slots keep the positions of
/// the other handlers stable, are reused most recently vacated first and are trimmed when they
/// reach the end of the chain.
pub(crate) struct FixedChain<A, const HANDLERS: usize, const CAPACITY: usize> {
    slots: BoundedStack<Option<Slot<A, CAPACITY>>, HANDLERS>,
    vacant: BoundedStack<usize, HANDLERS>,
    live: usize,
}

impl<A, const HANDLERS: usize, const CAPACITY: usize> FixedChain<A, HANDLERS, CAPACITY> {
    fn new() -> Self {
        Self {
            slots: BoundedStack::new(),
            vacant: BoundedStack::new(),
            live: 0,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Stores the handler in a vacant slot or behind the last one.
    ///
    /// Hands the handler back if every slot is occupied.
    fn insert(
        &mut self,
        handler: Callable<A, (), CAPACITY>,
        generation: u64,
    ) -> result::Result<usize, Callable<A, (), CAPACITY>> {
        let slot = Some(Slot {
            handler,
            generation,
        });

        let index = if let Some(index) = self.vacant.pop() {
            *self
                .slots
                .get_mut(index)
                .expect("vacant list only contains in-bounds indexes") = slot;
            index
        } else {
            let index = self.slots.len();

            if let Err(error) = self.slots.push(slot) {
                let slot = error
                    .into_inner()
                    .expect("we only ever push occupied slots");
                return Err(slot.handler);
            }

            index
        };

        self.live = self
            .live
            .checked_add(1)
            .expect("guarded by HANDLERS, which is a usize");

        Ok(index)
    }

    fn remove(&mut self, index: usize, generation: u64) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };

        if slot
            .as_ref()
            .is_none_or(|occupant| occupant.generation != generation)
        {
            return false;
        }

        *slot = None;
        self.live = self
            .live
            .checked_sub(1)
            .expect("the slot was occupied, so the live count is non-zero");

        if index.checked_add(1) == Some(self.slots.len()) {
            while matches!(self.slots.top(), Some(None)) {
                self.slots.pop();
            }

            let len = self.slots.len();
            self.vacant.remove_where(|vacant| *vacant >= len);
        } else {
            // There are fewer vacant slots than slots, so this cannot overflow.
            let pushed = self.vacant.push(index);
            debug_assert!(pushed.is_ok(), "vacant list overflowed the chain capacity");
        }

        true
    }

    fn clear(&mut self) -> usize {
        let removed = self.live;

        self.slots.clear();
        self.vacant.clear();
        self.live = 0;

        removed
    }

    fn handler_at(&self, index: usize) -> Option<Callable<A, (), CAPACITY>> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .map(|slot| slot.handler.clone())
    }

    fn find_same_target(&self, candidate: &Callable<A, (), CAPACITY>) -> Option<(usize, u64)> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            slot.as_ref()
                .filter(|slot| slot.handler.same_target(candidate))
                .map(|slot| (index, slot.generation))
        })
    }
}

/// One [`FixedChain`] per signal value, all allocated when the registry is created.
pub(crate) struct FixedRegistry<S, A, const HANDLERS: usize, const CAPACITY: usize> {
    chains: Box<[FixedChain<A, HANDLERS, CAPACITY>]>,
    next_generation: u64,

    _signal: PhantomData<fn() -> S>,
}

impl<S, A, const HANDLERS: usize, const CAPACITY: usize> FixedRegistry<S, A, HANDLERS, CAPACITY>
where
    S: FixedSignal,
{
    pub(crate) fn new() -> Self {
        Self {
            chains: iter::repeat_with(FixedChain::new).take(S::COUNT).collect(),
            next_generation: 0,
            _signal: PhantomData,
        }
    }

    pub(crate) fn connect(
        &mut self,
        signal: S,
        handler: Callable<A, (), CAPACITY>,
    ) -> Result<HandlerId<S>> {
        let signal_index = checked_index(signal)?;
        let generation = self.next_generation;

        let chain = self
            .chains
            .get_mut(signal_index)
            .expect("checked_index() guarantees the index is in bounds");

        let index = chain
            .insert(handler, generation)
            .map_err(|_rejected| Error::ChainFull {
                signal_index,
                capacity: HANDLERS,
            })?;

        self.next_generation = self
            .next_generation
            .checked_add(1)
            .expect("a 64-bit connection counter cannot realistically overflow");

        Ok(HandlerId::new(signal, index, generation))
    }

    /// Connects the handler unless a handler with the same identifiable target is already
    /// connected to the signal. The boolean is `true` if a new connection was made.
    pub(crate) fn connect_unique(
        &mut self,
        signal: S,
        handler: Callable<A, (), CAPACITY>,
    ) -> Result<(HandlerId<S>, bool)> {
        let existing = self
            .chains
            .get(checked_index(signal)?)
            .and_then(|chain| chain.find_same_target(&handler));

        match existing {
            Some((index, generation)) => Ok((HandlerId::new(signal, index, generation), false)),
            None => Ok((self.connect(signal, handler)?, true)),
        }
    }

    pub(crate) fn disconnect(&mut self, id: HandlerId<S>) -> bool {
        self.chains
            .get_mut(id.signal().index())
            .is_some_and(|chain| chain.remove(id.index(), id.generation()))
    }

    pub(crate) fn disconnect_all(&mut self, signal: S) -> usize {
        self.chains
            .get_mut(signal.index())
            .map_or(0, FixedChain::clear)
    }

    pub(crate) fn handler_count(&self, signal: S) -> usize {
        self.chains
            .get(signal.index())
            .map_or(0, |chain| chain.live)
    }

    pub(crate) fn total_handler_count(&self) -> usize {
        self.chains.iter().map(|chain| chain.live).sum()
    }

    pub(crate) fn chain_len(&self, signal: S) -> usize {
        self.chains.get(signal.index()).map_or(0, FixedChain::len)
    }

    pub(crate) fn handler_at(&self, signal: S, index: usize) -> Option<Callable<A, (), CAPACITY>> {
        self.chains
            .get(signal.index())
            .and_then(|chain| chain.handler_at(index))
    }
}

/// The index of `signal`, verified to be within the range its type declares.
pub(crate) fn checked_index<S: FixedSignal>(signal: S) -> Result<usize> {
    let index = signal.index();

    if index < S::COUNT {
        Ok(index)
    } else {
        Err(Error::SignalOutOfRange {
            index,
            count: S::COUNT,
        })
    }
}
