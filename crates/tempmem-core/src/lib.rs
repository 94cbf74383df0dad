//! Tempmem Core Library
//!
//! Working-memory slots for a production-rule agent kernel: the slot store
//! keyed by (identifier, attribute), change tracking for the decider,
//! deferred slot collection, context-dependent preference sets, and the
//! symbol reference counts that tie them together.

pub mod agent;
pub mod arena;
pub mod attach;
pub mod cdps;
pub mod change;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod obs;
pub mod pref;
pub mod slot;
pub mod symtab;
pub mod telemetry;
pub mod wme;

pub use agent::{Agent, AgentSummary, OPERATOR_ATTRIBUTE};
pub use arena::Index;
pub use change::{ChangeSet, ChangeTracker, DirtyGoal};
pub use collector::{DeferredCollector, SweepReport};
pub use config::AgentConfig;
pub use error::{Result, TempMemError};
pub use metrics::SlotMetrics;
pub use obs::PhaseSpan;
pub use pref::{
    Preference, PreferenceId, PreferenceLists, PreferenceStore, PreferenceType,
    NUM_PREFERENCE_TYPES,
};
pub use slot::{ChangeMarker, ImpasseType, Slot, SlotId, SlotStore};
pub use symtab::{GoalLevel, IdentifierInfo, SymbolId, SymbolTable, SymbolValue};
pub use telemetry::init_tracing;
pub use wme::{Wme, WmeId, WmeStore};

/// Tempmem version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
