//! Observability tests for slot lifecycle tracing.
//!
//! These verify that the structured events for slot creation, sweeps,
//! consumption and pool exhaustion are emitted with the agent name.

use tempmem_core::obs::{
    emit_changes_consumed, emit_pool_exhausted, emit_slot_created, emit_slot_deallocated,
    emit_sweep_finished,
};
use tempmem_core::{Agent, AgentConfig, GoalLevel, PhaseSpan, SweepReport};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_slot_created_logs_pair() {
    emit_slot_created("obs-agent", "B1", "color", false);
    assert!(logs_contain("slot.created"));
    assert!(logs_contain("obs-agent"));
}

#[traced_test]
#[test]
fn test_emit_slot_deallocated_logs_pair() {
    emit_slot_deallocated("obs-agent", "B1", "color");
    assert!(logs_contain("slot.deallocated"));
}

#[traced_test]
#[test]
fn test_emit_sweep_finished_logs_counts() {
    let report = SweepReport {
        examined: 3,
        reclaimed: 2,
        resurrected: 1,
        cdps_released: 0,
    };
    emit_sweep_finished("obs-agent", &report);
    assert!(logs_contain("sweep.finished"));
    assert!(logs_contain("reclaimed=2"));
}

#[traced_test]
#[test]
fn test_emit_changes_consumed_logs_level() {
    emit_changes_consumed("obs-agent", Some(GoalLevel(1)), 4);
    assert!(logs_contain("changes.consumed"));
    assert!(logs_contain("changed_slots=4"));
}

#[traced_test]
#[test]
fn test_emit_pool_exhausted_logs_error() {
    emit_pool_exhausted("obs-agent", "slot", 16);
    assert!(logs_contain("pool.exhausted"));
    assert!(logs_contain("ERROR"));
}

#[traced_test]
#[test]
fn test_phase_span_tags_sweep() {
    let mut agent = Agent::new(AgentConfig {
        name: "spanned".into(),
        ..AgentConfig::default()
    })
    .unwrap();
    {
        let _span = PhaseSpan::enter(agent.name(), "apply");
        let b = agent.symbols_mut().make_identifier('B', None).unwrap();
        let color = agent.symbols_mut().make_str_constant("color").unwrap();
        let slot = agent.make_slot(b, color).unwrap();
        agent.mark_slot_for_possible_removal(slot).unwrap();
        agent.remove_garbage_slots();
    }
    assert!(logs_contain("tempmem.phase"));
    assert!(logs_contain("sweep.finished"));
    assert!(logs_contain("spanned"));
}

#[traced_test]
#[test]
fn test_metrics_flush_logs_counters() {
    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.create_goal(GoalLevel(1)).unwrap();
    agent.flush_metrics();
    assert!(logs_contain("slots_created=1"));
}

#[traced_test]
#[test]
fn test_sweep_counter_traced() {
    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.remove_garbage_slots();
    assert!(logs_contain("counter incremented"));
    assert!(logs_contain("sweeps"));
}

#[traced_test]
#[test]
fn test_cdps_counter_traced() {
    let mut agent = Agent::new(AgentConfig {
        chunk_through_evaluation_rules: true,
        ..AgentConfig::default()
    })
    .unwrap();
    let b = agent.symbols_mut().make_identifier('B', None).unwrap();
    let color = agent.symbols_mut().make_str_constant("color").unwrap();
    let red = agent.symbols_mut().make_str_constant("red").unwrap();
    let slot = agent.make_slot(b, color).unwrap();
    let pref = agent
        .make_preference(tempmem_core::PreferenceType::Best, b, color, red, None)
        .unwrap();
    agent.add_to_cdps(slot, pref).unwrap();
    agent.clear_cdps(slot).unwrap();
    assert!(logs_contain("cdps_released"));
}
