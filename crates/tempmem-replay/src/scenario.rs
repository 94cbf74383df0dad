//! Scenario files: a recorded sequence of kernel calls against one agent.
//!
//! A scenario is JSON of the form
//!
//! ```json
//! { "steps": [
//!     { "op": "create_goal", "name": "G", "level": 2 },
//!     { "op": "identifier", "name": "B", "letter": "B" },
//!     { "op": "add_preference", "name": "p1", "kind": "acceptable",
//!       "id": "B", "attr": "color", "value": "red" },
//!     { "op": "sweep" }
//! ] }
//! ```
//!
//! Symbol operands name an identifier declared earlier by `identifier` or
//! `create_goal`; any other string is interned as a string constant.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tempmem_core::{
    Agent, AgentSummary, GoalLevel, PhaseSpan, PreferenceId, PreferenceType, SlotId,
    SlotMetrics, SweepReport, SymbolId, WmeId,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse scenario JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid scenario: {:?}", path))
    }
}

/// One recorded call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    CreateGoal {
        name: String,
        level: u32,
    },
    RetireGoal {
        goal: String,
    },
    Identifier {
        name: String,
        #[serde(default = "default_letter")]
        letter: char,
    },
    MakeSlot {
        id: String,
        attr: String,
    },
    AddPreference {
        name: String,
        kind: PreferenceType,
        id: String,
        attr: String,
        value: String,
        #[serde(default)]
        referent: Option<String>,
    },
    RemovePreference {
        pref: String,
    },
    /// Drop the creator's reference on a preference.
    ReleasePreference {
        pref: String,
    },
    AddWme {
        name: String,
        id: String,
        attr: String,
        value: String,
        #[serde(default)]
        acceptable: bool,
    },
    RemoveWme {
        wme: String,
    },
    AddToCdps {
        id: String,
        attr: String,
        pref: String,
    },
    MarkChanged {
        id: String,
        attr: String,
    },
    MarkForRemoval {
        id: String,
        attr: String,
    },
    Sweep,
    Consume,
    /// Fail the replay unless the slot's existence matches.
    ExpectSlot {
        id: String,
        attr: String,
        exists: bool,
    },
}

fn default_letter() -> char {
    'I'
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Step::CreateGoal { .. } => "create_goal",
            Step::RetireGoal { .. } => "retire_goal",
            Step::Identifier { .. } => "identifier",
            Step::MakeSlot { .. } => "make_slot",
            Step::AddPreference { .. } => "add_preference",
            Step::RemovePreference { .. } => "remove_preference",
            Step::ReleasePreference { .. } => "release_preference",
            Step::AddWme { .. } => "add_wme",
            Step::RemoveWme { .. } => "remove_wme",
            Step::AddToCdps { .. } => "add_to_cdps",
            Step::MarkChanged { .. } => "mark_changed",
            Step::MarkForRemoval { .. } => "mark_for_removal",
            Step::Sweep => "sweep",
            Step::Consume => "consume",
            Step::ExpectSlot { .. } => "expect_slot",
        }
    }
}

/// What the decider received at one consume point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeSummary {
    pub dirty_goal: Option<String>,
    pub dirty_level: Option<GoalLevel>,
    pub changed_slots: usize,
}

/// Outcome of a whole replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub agent: String,
    pub steps: usize,
    pub sweeps: Vec<SweepReport>,
    pub consumed: Vec<ConsumeSummary>,
    pub summary: AgentSummary,
    pub metrics: SlotMetrics,
}

/// Executes scenario steps against an agent, tracking the names the
/// scenario uses for handles.
pub struct Replayer {
    agent: Agent,
    identifiers: HashMap<String, SymbolId>,
    constants: HashMap<String, SymbolId>,
    preferences: HashMap<String, PreferenceId>,
    wmes: HashMap<String, WmeId>,
    sweeps: Vec<SweepReport>,
    consumed: Vec<ConsumeSummary>,
    steps: usize,
}

impl Replayer {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            identifiers: HashMap::new(),
            constants: HashMap::new(),
            preferences: HashMap::new(),
            wmes: HashMap::new(),
            sweeps: Vec::new(),
            consumed: Vec::new(),
            steps: 0,
        }
    }

    #[cfg(test)]
    fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn run(mut self, scenario: &Scenario) -> Result<ReplayReport> {
        for (i, step) in scenario.steps.iter().enumerate() {
            self.apply(step)
                .with_context(|| format!("Step {} ({}) failed", i + 1, step.op()))?;
        }
        self.agent.flush_metrics();
        Ok(self.finish())
    }

    pub fn apply(&mut self, step: &Step) -> Result<()> {
        let _span = PhaseSpan::enter(self.agent.name(), step.op());
        self.steps += 1;
        match step {
            Step::CreateGoal { name, level } => {
                let goal = self.agent.create_goal(GoalLevel(*level))?;
                self.declare(name, goal)?;
            }
            Step::RetireGoal { goal } => {
                let goal = self.identifier(goal)?;
                self.agent.retire_goal(goal)?;
            }
            Step::Identifier { name, letter } => {
                let id = self.agent.symbols_mut().make_identifier(*letter, None)?;
                self.declare(name, id)?;
            }
            Step::MakeSlot { id, attr } => {
                let id = self.identifier(id)?;
                let attr = self.symbol(attr)?;
                self.agent.make_slot(id, attr)?;
            }
            Step::AddPreference {
                name,
                kind,
                id,
                attr,
                value,
                referent,
            } => {
                let id = self.identifier(id)?;
                let attr = self.symbol(attr)?;
                let value = self.symbol(value)?;
                let referent = referent.as_deref().map(|r| self.symbol(r)).transpose()?;
                let pref = self
                    .agent
                    .make_preference(*kind, id, attr, value, referent)?;
                self.agent.add_preference_to_slot(pref)?;
                self.preferences.insert(name.clone(), pref);
            }
            Step::RemovePreference { pref } => {
                let pref = self.preference(pref)?;
                self.agent.remove_preference_from_slot(pref)?;
            }
            Step::ReleasePreference { pref } => {
                let handle = self.preference(pref)?;
                if self.agent.preference_remove_ref(handle)? {
                    self.preferences.remove(pref);
                }
            }
            Step::AddWme {
                name,
                id,
                attr,
                value,
                acceptable,
            } => {
                let id = self.identifier(id)?;
                let attr = self.symbol(attr)?;
                let value = self.symbol(value)?;
                let wme = self.agent.add_wme_to_slot(id, attr, value, *acceptable)?;
                self.wmes.insert(name.clone(), wme);
            }
            Step::RemoveWme { wme } => {
                let handle = self
                    .wmes
                    .remove(wme)
                    .ok_or_else(|| anyhow!("Unknown wme name '{}'", wme))?;
                self.agent.remove_wme_from_slot(handle)?;
            }
            Step::AddToCdps { id, attr, pref } => {
                let slot = self.existing_slot(id, attr)?;
                let pref = self.preference(pref)?;
                let added = self.agent.add_to_cdps(slot, pref)?;
                debug!(slot = %slot, added, "cdps step");
            }
            Step::MarkChanged { id, attr } => {
                let slot = self.existing_slot(id, attr)?;
                self.agent.mark_slot_as_changed(slot)?;
            }
            Step::MarkForRemoval { id, attr } => {
                let slot = self.existing_slot(id, attr)?;
                self.agent.mark_slot_for_possible_removal(slot)?;
            }
            Step::Sweep => {
                let report = self.agent.remove_garbage_slots();
                self.sweeps.push(report);
            }
            Step::Consume => {
                let set = self.agent.consume_changes();
                self.consumed.push(ConsumeSummary {
                    dirty_goal: set
                        .dirty_goal
                        .map(|d| self.agent.symbols().describe(d.goal)),
                    dirty_level: set.dirty_goal.map(|d| d.level),
                    changed_slots: set.changed_slots.len(),
                });
            }
            Step::ExpectSlot { id, attr, exists } => {
                let found = self.lookup_slot(id, attr).is_some();
                if found != *exists {
                    bail!(
                        "Expected slot ({}, {}) to {}",
                        id,
                        attr,
                        if *exists { "exist" } else { "be gone" }
                    );
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> ReplayReport {
        ReplayReport {
            agent: self.agent.name().to_string(),
            steps: self.steps,
            sweeps: self.sweeps,
            consumed: self.consumed,
            summary: self.agent.summary(),
            metrics: *self.agent.metrics(),
        }
    }

    fn declare(&mut self, name: &str, id: SymbolId) -> Result<()> {
        if self.identifiers.insert(name.to_string(), id).is_some() {
            bail!("Identifier name '{}' declared twice", name);
        }
        Ok(())
    }

    fn identifier(&self, name: &str) -> Result<SymbolId> {
        self.identifiers
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown identifier name '{}'", name))
    }

    /// Declared identifier, or a string constant interned once per replay.
    fn symbol(&mut self, name: &str) -> Result<SymbolId> {
        if let Some(id) = self.identifiers.get(name) {
            return Ok(*id);
        }
        if let Some(sym) = self.constants.get(name) {
            return Ok(*sym);
        }
        let sym = self.agent.symbols_mut().make_str_constant(name)?;
        self.constants.insert(name.to_string(), sym);
        Ok(sym)
    }

    fn preference(&self, name: &str) -> Result<PreferenceId> {
        self.preferences
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown preference name '{}'", name))
    }

    fn lookup_slot(&self, id: &str, attr: &str) -> Option<SlotId> {
        let id = self.identifiers.get(id).copied();
        let attr = self
            .identifiers
            .get(attr)
            .or_else(|| self.constants.get(attr))
            .copied()
            .or_else(|| self.agent.symbols().find_str_constant(attr))?;
        self.agent.find_slot(id, attr)
    }

    fn existing_slot(&self, id: &str, attr: &str) -> Result<SlotId> {
        self.lookup_slot(id, attr)
            .ok_or_else(|| anyhow!("No slot for ({}, {})", id, attr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempmem_core::AgentConfig;

    const GOAL_AND_COLOR: &str = r#"{
        "steps": [
            { "op": "create_goal", "name": "G", "level": 2 },
            { "op": "mark_changed", "id": "G", "attr": "operator" },
            { "op": "identifier", "name": "B", "letter": "B" },
            { "op": "add_preference", "name": "p1", "kind": "acceptable",
              "id": "B", "attr": "color", "value": "red" },
            { "op": "remove_preference", "pref": "p1" },
            { "op": "mark_for_removal", "id": "B", "attr": "color" },
            { "op": "sweep" },
            { "op": "expect_slot", "id": "B", "attr": "color", "exists": false },
            { "op": "consume" }
        ]
    }"#;

    fn replayer() -> Replayer {
        Replayer::new(Agent::new(AgentConfig::default()).unwrap())
    }

    #[test]
    fn test_goal_and_color_replay() {
        let scenario = Scenario::from_json(GOAL_AND_COLOR).unwrap();
        let report = replayer().run(&scenario).unwrap();

        assert_eq!(report.steps, 9);
        assert_eq!(report.sweeps.len(), 1);
        assert_eq!(report.sweeps[0].reclaimed, 1);
        assert_eq!(report.consumed.len(), 1);
        assert_eq!(report.consumed[0].dirty_level, Some(GoalLevel(2)));
        assert_eq!(report.consumed[0].dirty_goal.as_deref(), Some("S1"));
        assert_eq!(report.consumed[0].changed_slots, 0);
        // Only the goal's context slot is left.
        assert_eq!(report.summary.slots, 1);
    }

    #[test]
    fn test_failed_expectation_names_step() {
        let scenario = Scenario::from_json(
            r#"{ "steps": [
                { "op": "identifier", "name": "B" },
                { "op": "expect_slot", "id": "B", "attr": "color", "exists": true }
            ] }"#,
        )
        .unwrap();
        let err = replayer().run(&scenario).unwrap_err();
        assert!(format!("{:#}", err).contains("Step 2 (expect_slot)"));
    }

    #[test]
    fn test_unknown_op_rejected() {
        assert!(Scenario::from_json(r#"{ "steps": [ { "op": "explode" } ] }"#).is_err());
    }

    #[test]
    fn test_release_preference_forgets_name() {
        let mut replayer = replayer();
        for step in [
            r#"{ "op": "identifier", "name": "B" }"#,
            r#"{ "op": "add_preference", "name": "p", "kind": "best",
                 "id": "B", "attr": "size", "value": "big" }"#,
            r#"{ "op": "remove_preference", "pref": "p" }"#,
            r#"{ "op": "release_preference", "pref": "p" }"#,
        ] {
            let step: Step = serde_json::from_str(step).unwrap();
            replayer.apply(&step).unwrap();
        }
        assert!(replayer.preference("p").is_err());
        assert_eq!(replayer.agent().preferences().len(), 0);
    }

    #[test]
    fn test_duplicate_identifier_name_rejected() {
        let mut replayer = replayer();
        let step = Step::Identifier {
            name: "B".into(),
            letter: 'B',
        };
        replayer.apply(&step).unwrap();
        assert!(replayer.apply(&step).is_err());
    }
}
