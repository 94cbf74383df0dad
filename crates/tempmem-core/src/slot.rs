//! Slot store: the single index from (identifier, attribute) to the slot
//! holding everything known about that pair.
//!
//! Each identifier owns a chain of slot handles. New slots go to the head of
//! the chain; nothing else depends on chain order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::arena::{arena_id, Arena};
use crate::error::{Result, TempMemError};
use crate::obs;
use crate::pref::{PreferenceId, PreferenceLists};
use crate::symtab::SymbolId;
use crate::wme::WmeId;

arena_id!(
    /// Handle to a slot in one agent's slot pool.
    SlotId,
    "slot"
);

/// Change state of a slot as seen by the decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMarker {
    Clean,
    /// Context slot changed; the dirty goal was updated instead of queueing.
    Context,
    /// Ordinary slot with an entry on the pending-changes list.
    Queued,
}

/// Impasse currently recorded on a slot by the decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpasseType {
    #[default]
    None,
    ConstraintFailure,
    Conflict,
    Tie,
    NoChange,
}

/// All WMEs and preferences for one (identifier, attribute) pair.
#[derive(Debug, Clone)]
pub struct Slot {
    pub(crate) id: SymbolId,
    pub(crate) attr: SymbolId,
    pub(crate) isa_context_slot: bool,
    pub(crate) wmes: Vec<WmeId>,
    pub(crate) acceptable_preference_wmes: Vec<WmeId>,
    pub(crate) preferences: PreferenceLists,
    pub(crate) cdps: Vec<PreferenceId>,
    pub(crate) changed: ChangeMarker,
    pub(crate) acceptable_preference_changed: bool,
    pub(crate) impasse_type: ImpasseType,
    pub(crate) impasse_id: Option<SymbolId>,
    pub(crate) marked_for_possible_removal: bool,
}

impl Slot {
    fn new(id: SymbolId, attr: SymbolId, isa_context_slot: bool) -> Self {
        Self {
            id,
            attr,
            isa_context_slot,
            wmes: Vec::new(),
            acceptable_preference_wmes: Vec::new(),
            preferences: PreferenceLists::default(),
            cdps: Vec::new(),
            changed: ChangeMarker::Clean,
            acceptable_preference_changed: false,
            impasse_type: ImpasseType::None,
            impasse_id: None,
            marked_for_possible_removal: false,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn attr(&self) -> SymbolId {
        self.attr
    }

    pub fn isa_context_slot(&self) -> bool {
        self.isa_context_slot
    }

    pub fn wmes(&self) -> &[WmeId] {
        &self.wmes
    }

    pub fn acceptable_preference_wmes(&self) -> &[WmeId] {
        &self.acceptable_preference_wmes
    }

    pub fn preferences(&self) -> &PreferenceLists {
        &self.preferences
    }

    pub fn cdps(&self) -> &[PreferenceId] {
        &self.cdps
    }

    pub fn changed(&self) -> ChangeMarker {
        self.changed
    }

    pub fn is_changed(&self) -> bool {
        self.changed != ChangeMarker::Clean
    }

    pub fn acceptable_preference_changed(&self) -> bool {
        self.acceptable_preference_changed
    }

    pub fn impasse_type(&self) -> ImpasseType {
        self.impasse_type
    }

    pub fn impasse_id(&self) -> Option<SymbolId> {
        self.impasse_id
    }

    pub fn marked_for_possible_removal(&self) -> bool {
        self.marked_for_possible_removal
    }

    /// Whether any WME or preference still anchors this slot.
    pub fn has_content(&self) -> bool {
        !self.wmes.is_empty()
            || !self.acceptable_preference_wmes.is_empty()
            || !self.preferences.is_empty()
    }
}

/// Per-agent slot pool plus the identifier chains that index it.
#[derive(Debug, Default)]
pub struct SlotStore {
    slots: Arena<Slot>,
    chains: HashMap<SymbolId, Vec<SlotId>>,
}

impl SlotStore {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            slots: capacity.map(Arena::with_capacity_limit).unwrap_or_default(),
            chains: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: SlotId) -> Option<&Slot> {
        self.slots.get(slot.0)
    }

    pub(crate) fn get_mut(&mut self, slot: SlotId) -> Option<&mut Slot> {
        self.slots.get_mut(slot.0)
    }

    pub(crate) fn require_mut(&mut self, slot: SlotId) -> Result<&mut Slot> {
        self.get_mut(slot).ok_or(TempMemError::UnknownSlot(slot))
    }

    pub(crate) fn require(&self, slot: SlotId) -> Result<&Slot> {
        self.get(slot).ok_or(TempMemError::UnknownSlot(slot))
    }

    /// Slot for (`id`, `attr`), scanning `id`'s chain. A missing identifier
    /// is simply "not found".
    pub fn find(&self, id: Option<SymbolId>, attr: SymbolId) -> Option<SlotId> {
        let id = id?;
        self.chains.get(&id)?.iter().copied().find(|s| {
            self.slots
                .get(s.0)
                .is_some_and(|slot| slot.attr == attr)
        })
    }

    /// The identifier's slot chain, head first.
    pub fn slots_of(&self, id: SymbolId) -> &[SlotId] {
        self.chains.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Slot)> {
        self.slots.iter().map(|(i, s)| (SlotId(i), s))
    }

    fn allocate(&mut self, slot: Slot) -> Result<SlotId> {
        let id = slot.id;
        let capacity = self.slots.len();
        let handle = self
            .slots
            .insert(slot)
            .map(SlotId)
            .ok_or(TempMemError::PoolExhausted {
                pool: "slot",
                capacity,
            })?;
        self.chains.entry(id).or_default().insert(0, handle);
        Ok(handle)
    }

    /// Unlink from the identifier chain and free the pool entry.
    pub(crate) fn free(&mut self, handle: SlotId) -> Option<Slot> {
        let slot = self.slots.remove(handle.0)?;
        if let Some(chain) = self.chains.get_mut(&slot.id) {
            chain.retain(|s| *s != handle);
            if chain.is_empty() {
                self.chains.remove(&slot.id);
            }
        }
        Some(slot)
    }
}

impl Agent {
    /// Existing slot for (`id`, `attr`), if any. No side effects.
    pub fn find_slot(&self, id: Option<SymbolId>, attr: SymbolId) -> Option<SlotId> {
        self.slots.find(id, attr)
    }

    /// Existing slot for (`id`, `attr`), or a new empty one.
    ///
    /// A new slot is a context slot iff `id` is a goal and `attr` is the
    /// agent's `operator` symbol, and holds one reference on each of `id`
    /// and `attr`. Returns [`TempMemError::PoolExhausted`] when the slot pool
    /// is full; the agent must not be used after that.
    pub fn make_slot(&mut self, id: SymbolId, attr: SymbolId) -> Result<SlotId> {
        if let Some(existing) = self.slots.find(Some(id), attr) {
            return Ok(existing);
        }

        if !self.symbols.contains(id) {
            return Err(TempMemError::UnknownSymbol(id));
        }
        if !self.symbols.is_identifier(id) {
            return Err(TempMemError::NotAnIdentifier(id));
        }
        if !self.symbols.contains(attr) {
            return Err(TempMemError::UnknownSymbol(attr));
        }

        let isa_context_slot = self.symbols.is_goal(id) && attr == self.operator_symbol;
        let handle = match self.slots.allocate(Slot::new(id, attr, isa_context_slot)) {
            Ok(handle) => handle,
            Err(err) => {
                if let TempMemError::PoolExhausted { pool, capacity } = &err {
                    obs::emit_pool_exhausted(&self.config.name, pool, *capacity);
                }
                return Err(err);
            }
        };
        self.symbols.add_ref(id)?;
        self.symbols.add_ref(attr)?;
        self.metrics.inc_slots_created();

        obs::emit_slot_created(
            &self.config.name,
            &self.symbols.describe(id),
            &self.symbols.describe(attr),
            isa_context_slot,
        );
        Ok(handle)
    }

    pub fn slot(&self, slot: SlotId) -> Option<&Slot> {
        self.slots.get(slot)
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn slots_of(&self, id: SymbolId) -> &[SlotId] {
        self.slots.slots_of(id)
    }
}
