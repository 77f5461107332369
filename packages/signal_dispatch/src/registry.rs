use std::hash::Hash;

use foldhash::{HashMap, HashMapExt};
use inline_fn::Callable;

use crate::HandlerId;

/// A connected handler plus the generation stamp of its connection.
pub(crate) struct Slot<A, const CAPACITY: usize> {
    pub(crate) handler: Callable<A, (), CAPACITY>,
    pub(crate) generation: u64,
}

/// The handlers connected to one signal, in invocation order.
///
/// Disconnecting a handler leaves a vacant slot behind so that the positions of the other
/// handlers do not change. Vacant slots are reused (most recently vacated first) before the chain
/// grows. A vacant slot at the end of the chain is removed instead of being recorded for reuse.
pub(crate) struct HandlerChain<A, const CAPACITY: usize> {
    slots: Vec<Option<Slot<A, CAPACITY>>>,

    // Indexes of vacant slots, all less than `slots.len()`. Last entry is reused first.
    vacant: Vec<usize>,

    live: usize,
}

impl<A, const CAPACITY: usize> HandlerChain<A, CAPACITY> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    /// Number of positions a dispatch has to walk, including vacant ones.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of connected handlers.
    pub(crate) const fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn insert(&mut self, handler: Callable<A, (), CAPACITY>, generation: u64) -> usize {
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
            self.slots.push(slot);
            self.slots
                .len()
                .checked_sub(1)
                .expect("we just pushed a slot")
        };

        self.live = self
            .live
            .checked_add(1)
            .expect("cannot have more live handlers than addressable memory");

        index
    }

    /// Removes the handler at `index` if it still belongs to the connection stamped `generation`.
    pub(crate) fn remove(&mut self, index: usize, generation: u64) -> bool {
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
            self.trim_vacant_tail();
        } else {
            self.vacant.push(index);
        }

        true
    }

    /// Removes every handler. Returns how many were connected.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.live;

        self.slots.clear();
        self.vacant.clear();
        self.live = 0;

        removed
    }

    /// A clone of the handler at `index`, or `None` if that position is vacant or out of range.
    pub(crate) fn handler_at(&self, index: usize) -> Option<Callable<A, (), CAPACITY>> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .map(|slot| slot.handler.clone())
    }

    /// Position and generation of the first handler with the same identifiable target.
    pub(crate) fn find_same_target(
        &self,
        candidate: &Callable<A, (), CAPACITY>,
    ) -> Option<(usize, u64)> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            slot.as_ref()
                .filter(|slot| slot.handler.same_target(candidate))
                .map(|slot| (index, slot.generation))
        })
    }

    fn trim_vacant_tail(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }

        let len = self.slots.len();
        self.vacant.retain(|index| *index < len);
    }
}

/// Maps signals to their handler chains.
///
/// Every connection is stamped with a generation number that is unique within the registry, so a
/// [`HandlerId`] can never accidentally disconnect a later handler that reused its slot.
pub(crate) struct HandlerRegistry<S, A, const CAPACITY: usize> {
    chains: HashMap<S, HandlerChain<A, CAPACITY>>,
    next_generation: u64,
}

impl<S, A, const CAPACITY: usize> HandlerRegistry<S, A, CAPACITY>
where
    S: Copy + Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            chains: HashMap::new(),
            next_generation: 0,
        }
    }

    pub(crate) fn connect(
        &mut self,
        signal: S,
        handler: Callable<A, (), CAPACITY>,
    ) -> HandlerId<S> {
        let generation = self.take_generation();

        let index = self
            .chains
            .entry(signal)
            .or_insert_with(HandlerChain::new)
            .insert(handler, generation);

        HandlerId::new(signal, index, generation)
    }

    /// Connects the handler unless a handler with the same identifiable target is already
    /// connected to the signal, in which case the existing connection is returned.
    ///
    /// The boolean is `true` if a new connection was made.
    pub(crate) fn connect_unique(
        &mut self,
        signal: S,
        handler: Callable<A, (), CAPACITY>,
    ) -> (HandlerId<S>, bool) {
        let existing = self
            .chains
            .get(&signal)
            .and_then(|chain| chain.find_same_target(&handler));

        match existing {
            Some((index, generation)) => (HandlerId::new(signal, index, generation), false),
            None => (self.connect(signal, handler), true),
        }
    }

    pub(crate) fn disconnect(&mut self, id: HandlerId<S>) -> bool {
        let signal = id.signal();

        let Some(chain) = self.chains.get_mut(&signal) else {
            return false;
        };

        let removed = chain.remove(id.index(), id.generation());

        if chain.is_empty() {
            self.chains.remove(&signal);
        }

        removed
    }

    pub(crate) fn disconnect_all(&mut self, signal: S) -> usize {
        self.chains
            .remove(&signal)
            .map_or(0, |mut chain| chain.clear())
    }

    pub(crate) fn handler_count(&self, signal: S) -> usize {
        self.chains.get(&signal).map_or(0, HandlerChain::live)
    }

    pub(crate) fn total_handler_count(&self) -> usize {
        self.chains.values().map(HandlerChain::live).sum()
    }

    /// Number of chain positions a dispatch of `signal` has to walk.
    pub(crate) fn chain_len(&self, signal: S) -> usize {
        self.chains.get(&signal).map_or(0, HandlerChain::len)
    }

    pub(crate) fn handler_at(&self, signal: S, index: usize) -> Option<Callable<A, (), CAPACITY>> {
        self.chains
            .get(&signal)
            .and_then(|chain| chain.handler_at(index))
    }

    fn take_generation(&mut self) -> u64 {
        let generation = self.next_generation;

        self.next_generation = self
            .next_generation
            .checked_add(1)
            .expect("a 64-bit connection counter cannot realistically overflow");

        generation
    }
}
