//! The per-agent context.
//!
//! An [`Agent`] owns every pool, table and list the working-memory core
//! uses. Operations take it by `&mut`, so one agent is only ever touched by
//! one caller at a time, and two agents share nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::change::ChangeTracker;
use crate::collector::DeferredCollector;
use crate::config::AgentConfig;
use crate::error::{Result, TempMemError};
use crate::metrics::SlotMetrics;
use crate::pref::PreferenceStore;
use crate::slot::{ChangeMarker, SlotStore};
use crate::symtab::{GoalLevel, SymbolId, SymbolTable};
use crate::wme::WmeStore;

/// Name of the reserved attribute that makes a goal's slot a context slot.
pub const OPERATOR_ATTRIBUTE: &str = "operator";

/// Working-memory state of one agent.
#[derive(Debug)]
pub struct Agent {
    pub(crate) config: AgentConfig,
    pub(crate) symbols: SymbolTable,
    pub(crate) slots: SlotStore,
    pub(crate) preferences: PreferenceStore,
    pub(crate) wmes: WmeStore,
    pub(crate) changes: ChangeTracker,
    pub(crate) collector: DeferredCollector,
    pub(crate) metrics: SlotMetrics,
    pub(crate) operator_symbol: SymbolId,
}

/// Point-in-time sizes of an agent's stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub symbols: usize,
    pub slots: usize,
    pub preferences: usize,
    pub wmes: usize,
    pub pending_changes: usize,
    pub removal_candidates: usize,
    pub dirty_level: Option<GoalLevel>,
}

impl Agent {
    /// Create an agent. The agent holds one reference on its `operator`
    /// symbol for its whole lifetime.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let mut symbols = SymbolTable::new();
        let operator_symbol = symbols.make_str_constant(OPERATOR_ATTRIBUTE)?;
        info!(
            agent = %config.name,
            cdps = config.chunk_through_evaluation_rules,
            "agent created"
        );
        Ok(Self {
            slots: SlotStore::new(config.slot_pool_capacity),
            preferences: PreferenceStore::new(config.preference_pool_capacity),
            wmes: WmeStore::new(config.wme_pool_capacity),
            changes: ChangeTracker::new(),
            collector: DeferredCollector::new(),
            metrics: SlotMetrics::new(),
            config,
            symbols,
            operator_symbol,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Symbol table access for callers that intern constants and manage
    /// their own references.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn operator_symbol(&self) -> SymbolId {
        self.operator_symbol
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn wmes(&self) -> &WmeStore {
        &self.wmes
    }

    pub fn metrics(&self) -> &SlotMetrics {
        &self.metrics
    }

    pub fn flush_metrics(&self) {
        self.metrics.flush(&self.config.name);
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            symbols: self.symbols.len(),
            slots: self.slots.len(),
            preferences: self.preferences.len(),
            wmes: self.wmes.len(),
            pending_changes: self.changes.pending_len(),
            removal_candidates: self.collector.len(),
            dirty_level: self.shallowest_dirty_level(),
        }
    }

    /// Mint a goal identifier at `level` together with its operator
    /// context slot. The caller owns the identifier's first reference.
    pub fn create_goal(&mut self, level: GoalLevel) -> Result<SymbolId> {
        let goal = self.symbols.make_identifier('S', Some(level))?;
        self.symbols.mark_goal(goal, level)?;
        let op = self.operator_symbol;
        self.make_slot(goal, op)?;
        info!(
            agent = %self.config.name,
            goal = %self.symbols.describe(goal),
            level = %level,
            "goal created"
        );
        Ok(goal)
    }

    /// Retire a goal: its context slots become ordinary slots queued for
    /// the next sweep, and the caller's reference on the identifier is
    /// released. If it was the dirty goal, the dirty goal is cleared.
    pub fn retire_goal(&mut self, goal: SymbolId) -> Result<()> {
        if !self.symbols.contains(goal) {
            return Err(TempMemError::UnknownSymbol(goal));
        }
        if !self.symbols.is_identifier(goal) {
            return Err(TempMemError::NotAnIdentifier(goal));
        }
        if !self.symbols.is_goal(goal) {
            return Err(TempMemError::NotAGoal(goal));
        }
        self.symbols.unmark_goal(goal)?;
        if self.changes.forget_goal(goal) {
            debug!(goal = %goal, "retired goal was the dirty goal");
        }

        let context_slots: Vec<_> = self
            .slots
            .slots_of(goal)
            .iter()
            .copied()
            .filter(|s| self.slots.get(*s).is_some_and(|slot| slot.isa_context_slot))
            .collect();
        for slot in context_slots {
            let s = self.slots.require_mut(slot)?;
            s.isa_context_slot = false;
            s.changed = ChangeMarker::Clean;
            self.mark_slot_for_possible_removal(slot)?;
        }

        info!(
            agent = %self.config.name,
            goal = %self.symbols.describe(goal),
            "goal retired"
        );
        self.symbols.remove_ref(goal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_holds_operator_symbol() {
        let agent = Agent::new(AgentConfig::default()).unwrap();
        let op = agent.operator_symbol();
        assert_eq!(agent.symbols().reference_count(op), Some(1));
        assert_eq!(agent.symbols().describe(op), OPERATOR_ATTRIBUTE);
        assert_eq!(agent.summary().slots, 0);
    }

    #[test]
    fn test_create_goal_makes_context_slot() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let goal = agent.create_goal(GoalLevel(1)).unwrap();
        assert!(agent.symbols().is_goal(goal));

        let slot = agent.find_slot(Some(goal), agent.operator_symbol()).unwrap();
        assert!(agent.slot(slot).unwrap().isa_context_slot());
        // Creator reference plus the context slot's.
        assert_eq!(agent.symbols().reference_count(goal), Some(2));
    }

    #[test]
    fn test_retire_goal_reclaims_context_slot() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let op = agent.operator_symbol();
        let goal = agent.create_goal(GoalLevel(1)).unwrap();
        let slot = agent.find_slot(Some(goal), op).unwrap();
        agent.mark_slot_as_changed(slot).unwrap();

        agent.retire_goal(goal).unwrap();
        let report = agent.remove_garbage_slots();
        assert_eq!(report.reclaimed, 1);
        assert!(!agent.symbols().contains(goal));
        assert_eq!(agent.symbols().reference_count(op), Some(1));
    }

    #[test]
    fn test_retire_dirty_goal_then_consume_has_no_dirty_goal() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let op = agent.operator_symbol();
        let goal = agent.create_goal(GoalLevel(1)).unwrap();
        let slot = agent.find_slot(Some(goal), op).unwrap();
        agent.mark_slot_as_changed(slot).unwrap();
        assert_eq!(agent.shallowest_dirty_level(), Some(GoalLevel(1)));

        agent.retire_goal(goal).unwrap();
        agent.remove_garbage_slots();
        let set = agent.consume_changes();
        assert!(set.dirty_goal.is_none());
        assert!(set.changed_slots.is_empty());
    }

    #[test]
    fn test_retire_keeps_other_dirty_goal() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let op = agent.operator_symbol();
        let top = agent.create_goal(GoalLevel(1)).unwrap();
        let sub = agent.create_goal(GoalLevel(2)).unwrap();
        let ctx = agent.find_slot(Some(top), op).unwrap();
        agent.mark_slot_as_changed(ctx).unwrap();

        agent.retire_goal(sub).unwrap();
        agent.remove_garbage_slots();
        let set = agent.consume_changes();
        assert_eq!(set.dirty_goal.map(|d| d.goal), Some(top));
    }

    #[test]
    fn test_retire_non_goal_rejected() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let b = agent.symbols_mut().make_identifier('B', None).unwrap();
        assert!(matches!(
            agent.retire_goal(b),
            Err(TempMemError::NotAGoal(_))
        ));

        let red = agent.symbols_mut().make_str_constant("red").unwrap();
        assert!(matches!(
            agent.retire_goal(red),
            Err(TempMemError::NotAnIdentifier(_))
        ));
    }
}
