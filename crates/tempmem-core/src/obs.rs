//! Structured observability hooks for slot lifecycle events.
//!
//! This module provides:
//! - Phase-scoped tracing spans via the `PhaseSpan` RAII guard
//! - Emission functions for slot creation, deallocation, sweeps and change
//!   hand-off to the decider
//!
//! Per-slot events are `debug!`; per-phase summaries are `info!`.

use tracing::{debug, error, info};

use crate::collector::SweepReport;
use crate::symtab::GoalLevel;

/// RAII guard that enters an agent/phase span for the duration of a
/// decision-cycle phase.
///
/// ```ignore
/// let _span = PhaseSpan::enter("blocks", "apply");
/// // every event below is tagged agent=blocks phase=apply
/// ```
pub struct PhaseSpan {
    _span: tracing::span::EnteredSpan,
}

impl PhaseSpan {
    pub fn enter(agent: &str, phase: &str) -> Self {
        let span = tracing::info_span!("tempmem.phase", agent = %agent, phase = %phase);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a slot was created.
pub fn emit_slot_created(agent: &str, id: &str, attr: &str, context: bool) {
    debug!(event = "slot.created", agent = %agent, id = %id, attr = %attr, context = context);
}

/// Emit event: a slot was freed by a sweep.
pub fn emit_slot_deallocated(agent: &str, id: &str, attr: &str) {
    debug!(event = "slot.deallocated", agent = %agent, id = %id, attr = %attr);
}

/// Emit event: a sweep finished.
pub fn emit_sweep_finished(agent: &str, report: &SweepReport) {
    info!(
        event = "sweep.finished",
        agent = %agent,
        examined = report.examined,
        reclaimed = report.reclaimed,
        resurrected = report.resurrected,
        cdps_released = report.cdps_released,
    );
}

/// Emit event: the decider consumed the pending changes.
pub fn emit_changes_consumed(agent: &str, dirty_level: Option<GoalLevel>, changed_slots: usize) {
    info!(
        event = "changes.consumed",
        agent = %agent,
        dirty_level = ?dirty_level.map(|l| l.0),
        changed_slots = changed_slots,
    );
}

/// Emit event: a pool ran out (error level; the agent is unusable).
pub fn emit_pool_exhausted(agent: &str, pool: &str, capacity: usize) {
    error!(event = "pool.exhausted", agent = %agent, pool = %pool, capacity = capacity);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_span_enter() {
        let _span = PhaseSpan::enter("test-agent", "apply");
    }
}
