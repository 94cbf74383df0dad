//! Error taxonomy for the working-memory core.
//!
//! Only caller mistakes and resource exhaustion surface here. Broken
//! internal invariants are debug assertions, and benign no-ops (double
//! marking, lookups on a missing identifier) are not errors at all.

use crate::pref::PreferenceId;
use crate::slot::SlotId;
use crate::symtab::SymbolId;
use crate::wme::WmeId;

/// Errors produced by working-memory operations.
#[derive(Debug, thiserror::Error)]
pub enum TempMemError {
    /// A fixed-size pool is full. Fatal for the agent: the slot graph may
    /// be partially built and must not be used further.
    #[error("{pool} pool exhausted at capacity {capacity}")]
    PoolExhausted { pool: &'static str, capacity: usize },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(SymbolId),

    #[error("symbol {0} is not an identifier")]
    NotAnIdentifier(SymbolId),

    #[error("identifier {0} is not a goal")]
    NotAGoal(SymbolId),

    #[error("unknown slot: {0}")]
    UnknownSlot(SlotId),

    #[error("unknown preference: {0}")]
    UnknownPreference(PreferenceId),

    #[error("unknown wme: {0}")]
    UnknownWme(WmeId),

    #[error("preference {0} is already attached to a slot")]
    PreferenceAlreadyInSlot(PreferenceId),

    #[error("preference {0} is not attached to a slot")]
    PreferenceNotInSlot(PreferenceId),

    #[error("binary preference type {kind} requires a referent")]
    MissingReferent { kind: String },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TempMemError {
    /// Whether the agent must be abandoned after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }
}

/// Result type for working-memory operations.
pub type Result<T> = std::result::Result<T, TempMemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_exhausted_display() {
        let err = TempMemError::PoolExhausted {
            pool: "slot",
            capacity: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("slot pool exhausted"));
        assert!(msg.contains("16"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_referent_not_fatal() {
        let err = TempMemError::MissingReferent {
            kind: "better".to_string(),
        };
        assert!(err.to_string().contains("better"));
        assert!(!err.is_fatal());
    }
}
