//! Per-agent slot counters.
//!
//! Counters are bumped silently at the call site. Call
//! [`SlotMetrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a decision cycle). Each agent
//! owns its own counters; nothing here is shared between agents.

use serde::{Deserialize, Serialize};

/// Lightweight counters for slot lifecycle events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMetrics {
    slots_created: u64,
    slots_reclaimed: u64,
    slots_resurrected: u64,
    cdps_released: u64,
    sweeps: u64,
}

impl SlotMetrics {
    pub const fn new() -> Self {
        Self {
            slots_created: 0,
            slots_reclaimed: 0,
            slots_resurrected: 0,
            cdps_released: 0,
            sweeps: 0,
        }
    }

    pub(crate) fn inc_slots_created(&mut self) {
        self.slots_created += 1;
        tracing::trace!(metric = "slots_created", "counter incremented");
    }

    pub(crate) fn inc_slots_reclaimed(&mut self) {
        self.slots_reclaimed += 1;
        tracing::trace!(metric = "slots_reclaimed", "counter incremented");
    }

    pub(crate) fn inc_slots_resurrected(&mut self) {
        self.slots_resurrected += 1;
        tracing::trace!(metric = "slots_resurrected", "counter incremented");
    }

    pub(crate) fn add_cdps_released(&mut self, n: usize) {
        self.cdps_released += n as u64;
        tracing::trace!(metric = "cdps_released", n, "counter incremented");
    }

    pub(crate) fn inc_sweeps(&mut self) {
        self.sweeps += 1;
        tracing::trace!(metric = "sweeps", "counter incremented");
    }

    /// Emit all current counter values as one `info!` event.
    pub fn flush(&self, agent: &str) {
        tracing::info!(
            metric = "flush",
            agent = %agent,
            slots_created = self.slots_created,
            slots_reclaimed = self.slots_reclaimed,
            slots_resurrected = self.slots_resurrected,
            cdps_released = self.cdps_released,
            sweeps = self.sweeps,
        );
    }

    pub fn slots_created(&self) -> u64 {
        self.slots_created
    }

    pub fn slots_reclaimed(&self) -> u64 {
        self.slots_reclaimed
    }

    pub fn slots_resurrected(&self) -> u64 {
        self.slots_resurrected
    }

    pub fn cdps_released(&self) -> u64 {
        self.cdps_released
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Reset all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
