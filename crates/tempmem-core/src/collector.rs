//! Deferred slot collection.
//!
//! When the last preference or WME leaves a slot it is only marked for
//! possible removal: later actions of the same rule firing may refill it.
//! At the end of the phase [`Agent::remove_garbage_slots`] sweeps the
//! candidates and frees the ones that are still empty.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::Agent;
use crate::error::Result;
use crate::obs;
use crate::slot::{ChangeMarker, SlotId};
use crate::symtab::SymbolId;

/// Agent-wide list of slots that may be empty.
#[derive(Debug, Default)]
pub struct DeferredCollector {
    candidates: VecDeque<SlotId>,
}

impl DeferredCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.candidates.contains(&slot)
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub examined: usize,
    pub reclaimed: usize,
    pub resurrected: usize,
    pub cdps_released: usize,
}

impl Agent {
    /// Queue `slot` for the next sweep. Marking an already marked slot does
    /// nothing.
    pub fn mark_slot_for_possible_removal(&mut self, slot: SlotId) -> Result<()> {
        let s = self.slots.require_mut(slot)?;
        if s.marked_for_possible_removal {
            return Ok(());
        }
        s.marked_for_possible_removal = true;
        self.collector.candidates.push_back(slot);
        Ok(())
    }

    pub fn collector(&self) -> &DeferredCollector {
        &self.collector
    }

    /// Sweep every removal candidate. Slots that were refilled since they
    /// were marked are unmarked and kept; empty ones are freed along with
    /// their CDPS, change record and symbol references. Always runs to
    /// completion.
    pub fn remove_garbage_slots(&mut self) -> SweepReport {
        let span = tracing::debug_span!("tempmem.sweep", agent = %self.config.name);
        let _guard = span.enter();

        let mut report = SweepReport::default();
        while let Some(handle) = self.collector.candidates.pop_front() {
            report.examined += 1;
            let Some(slot) = self.slots.get_mut(handle) else {
                warn!(slot = %handle, "removal candidate already freed");
                debug_assert!(false, "removal candidate {handle} already freed");
                continue;
            };

            if slot.has_content() {
                slot.marked_for_possible_removal = false;
                report.resurrected += 1;
                self.metrics.inc_slots_resurrected();
                continue;
            }

            report.cdps_released += self.deallocate_slot(handle);
            report.reclaimed += 1;
        }

        self.metrics.inc_sweeps();
        obs::emit_sweep_finished(&self.config.name, &report);
        report
    }

    /// Free an empty slot. Returns the number of CDPS references released.
    fn deallocate_slot(&mut self, handle: SlotId) -> usize {
        let Some(slot) = self.slots.get(handle) else {
            return 0;
        };
        debug_assert!(
            !slot.isa_context_slot,
            "sweeping context slot {handle}; context slots live as long as their goal"
        );
        let has_cdps = !slot.cdps.is_empty();
        let queued = !slot.isa_context_slot && slot.changed == ChangeMarker::Queued;

        if self.config.trace_slot_deallocation {
            debug!(
                slot = %handle,
                id = %self.symbols.describe(slot.id),
                attr = %self.symbols.describe(slot.attr),
                "deallocate slot"
            );
        }

        let mut released = 0;
        if has_cdps && self.config.chunk_through_evaluation_rules {
            released = self.release_cdps(handle);
        }
        if queued {
            self.changes.release(handle);
        }

        let Some(slot) = self.slots.free(handle) else {
            return released;
        };
        if let Some(impasse_id) = slot.impasse_id {
            self.release_symbol(impasse_id);
        }
        self.release_symbol(slot.id);
        self.release_symbol(slot.attr);
        self.metrics.inc_slots_reclaimed();
        obs::emit_slot_deallocated(
            &self.config.name,
            &self.symbols.describe(slot.id),
            &self.symbols.describe(slot.attr),
        );
        released
    }

    /// Drop a reference the sweep owns. Failure means the slot graph was
    /// already corrupt; the sweep carries on regardless.
    pub(crate) fn release_symbol(&mut self, sym: SymbolId) {
        if let Err(err) = self.symbols.remove_ref(sym) {
            warn!(symbol = %sym, %err, "releasing symbol reference failed");
            debug_assert!(false, "released dead symbol {sym}");
        }
    }
}
