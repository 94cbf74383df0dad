//! Change tracking for the decider.
//!
//! Ordinary slots that change are queued once on the pending-changes list.
//! Context slots are never queued: instead the agent remembers the
//! shallowest goal whose context changed, which tells the decider how far up
//! the goal stack it has to re-decide. Both are handed to the decider once
//! per cycle by [`Agent::consume_changes`].

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::error::Result;
use crate::obs;
use crate::slot::{ChangeMarker, SlotId};
use crate::symtab::{GoalLevel, SymbolId};

/// The shallowest goal whose context changed this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyGoal {
    pub goal: SymbolId,
    pub level: GoalLevel,
}

/// Everything the decider takes over at a consume point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub dirty_goal: Option<DirtyGoal>,
    pub changed_slots: Vec<SlotId>,
}

/// Agent-wide pending-changes list and dirty goal.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    changed_slots: IndexSet<SlotId>,
    dirty_goal: Option<DirtyGoal>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dirty_goal(&self) -> Option<DirtyGoal> {
        self.dirty_goal
    }

    pub fn pending_len(&self) -> usize {
        self.changed_slots.len()
    }

    pub fn is_pending(&self, slot: SlotId) -> bool {
        self.changed_slots.contains(&slot)
    }

    pub fn pending(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.changed_slots.iter().copied()
    }

    /// Keep whichever of the recorded and the new goal is shallower.
    pub(crate) fn note_context_change(&mut self, goal: SymbolId, level: GoalLevel) {
        match self.dirty_goal {
            Some(current) if current.level <= level => {}
            _ => self.dirty_goal = Some(DirtyGoal { goal, level }),
        }
    }

    /// Drop the dirty goal if it is `goal`. Returns whether it was.
    pub(crate) fn forget_goal(&mut self, goal: SymbolId) -> bool {
        match self.dirty_goal {
            Some(current) if current.goal == goal => {
                self.dirty_goal = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn enqueue(&mut self, slot: SlotId) -> bool {
        self.changed_slots.insert(slot)
    }

    /// Drop the record for a slot that is being collected.
    pub(crate) fn release(&mut self, slot: SlotId) -> bool {
        self.changed_slots.swap_remove(&slot)
    }

    fn take(&mut self) -> (Option<DirtyGoal>, Vec<SlotId>) {
        let slots = self.changed_slots.drain(..).collect();
        (self.dirty_goal.take(), slots)
    }
}

impl Agent {
    /// Record that `slot`'s preferences changed.
    ///
    /// Context slots lower the dirty goal to their goal if it is shallower
    /// than the one recorded. Ordinary slots are queued on the pending list
    /// the first time they change; later calls are no-ops until the decider
    /// drains the list.
    pub fn mark_slot_as_changed(&mut self, slot: SlotId) -> Result<()> {
        let s = self.slots.require_mut(slot)?;
        if s.isa_context_slot {
            let goal = s.id;
            s.changed = ChangeMarker::Context;
            let level = self.symbols.goal_level(goal);
            debug_assert!(level.is_some(), "context slot goal {goal} has no level");
            // A goal without a level orders below every real level.
            let level = level.unwrap_or(GoalLevel(u32::MAX));
            self.changes.note_context_change(goal, level);
        } else if s.changed == ChangeMarker::Clean {
            s.changed = ChangeMarker::Queued;
            self.changes.enqueue(slot);
        }
        Ok(())
    }

    /// Flag that the acceptable/require preferences of `slot` changed.
    pub fn mark_acceptable_preference_changed(&mut self, slot: SlotId) -> Result<()> {
        self.slots.require_mut(slot)?.acceptable_preference_changed = true;
        Ok(())
    }

    /// Read and reset the acceptable-preference-changed flag.
    pub fn take_acceptable_preference_changed(&mut self, slot: SlotId) -> Result<bool> {
        let s = self.slots.require_mut(slot)?;
        Ok(std::mem::take(&mut s.acceptable_preference_changed))
    }

    /// Reset a context slot's changed marker once the decider has
    /// re-decided it. Ordinary slots are reset by [`Agent::consume_changes`].
    pub fn clear_context_changed(&mut self, slot: SlotId) -> Result<()> {
        let s = self.slots.require_mut(slot)?;
        if s.changed == ChangeMarker::Context {
            s.changed = ChangeMarker::Clean;
        }
        Ok(())
    }

    /// The shallowest goal whose context changed since the last consume.
    pub fn highest_goal_whose_context_changed(&self) -> Option<DirtyGoal> {
        self.changes.dirty_goal()
    }

    pub fn shallowest_dirty_level(&self) -> Option<GoalLevel> {
        self.changes.dirty_goal().map(|d| d.level)
    }

    pub fn changes(&self) -> &ChangeTracker {
        &self.changes
    }

    /// Hand the dirty goal and the pending-changes list to the decider,
    /// resetting both. Drained slots go back to a clean marker.
    pub fn consume_changes(&mut self) -> ChangeSet {
        let (dirty_goal, changed_slots) = self.changes.take();
        for slot in &changed_slots {
            if let Some(s) = self.slots.get_mut(*slot) {
                s.changed = ChangeMarker::Clean;
            }
        }
        obs::emit_changes_consumed(
            &self.config.name,
            dirty_goal.map(|d| d.level),
            changed_slots.len(),
        );
        ChangeSet {
            dirty_goal,
            changed_slots,
        }
    }
}
