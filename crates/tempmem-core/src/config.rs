//! Agent configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for one agent's working memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent name, attached to every log event
    pub name: String,
    /// Build and release CDPS sets (needed when learning through
    /// evaluation rules). Fixed for the agent's lifetime.
    pub chunk_through_evaluation_rules: bool,
    /// Hard cap on live slots; `None` is unbounded
    pub slot_pool_capacity: Option<usize>,
    /// Hard cap on live preferences
    pub preference_pool_capacity: Option<usize>,
    /// Hard cap on live WMEs
    pub wme_pool_capacity: Option<usize>,
    /// Log every slot deallocation at debug level
    pub trace_slot_deallocation: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            name: "agent".to_string(),
            chunk_through_evaluation_rules: false,
            slot_pool_capacity: None,
            preference_pool_capacity: None,
            wme_pool_capacity: None,
            trace_slot_deallocation: false,
        }
    }
}

impl AgentConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
