//! Two agents in one process share no working-memory state.

use tempmem_core::{Agent, AgentConfig, GoalLevel, PreferenceType};

fn named(name: &str) -> Agent {
    Agent::new(AgentConfig {
        name: name.into(),
        ..AgentConfig::default()
    })
    .unwrap()
}

#[test]
fn test_changes_stay_in_their_agent() {
    let mut left = named("left");
    let mut right = named("right");

    let goal = left.create_goal(GoalLevel(1)).unwrap();
    let ctx = left.find_slot(Some(goal), left.operator_symbol()).unwrap();
    left.mark_slot_as_changed(ctx).unwrap();

    let b = right.symbols_mut().make_identifier('B', None).unwrap();
    let color = right.symbols_mut().make_str_constant("color").unwrap();
    let slot = right.make_slot(b, color).unwrap();
    right.mark_slot_as_changed(slot).unwrap();
    right.mark_slot_for_possible_removal(slot).unwrap();

    assert_eq!(left.shallowest_dirty_level(), Some(GoalLevel(1)));
    assert!(right.shallowest_dirty_level().is_none());
    assert_eq!(left.changes().pending_len(), 0);
    assert_eq!(right.changes().pending_len(), 1);
    assert!(left.collector().is_empty());

    let report = left.remove_garbage_slots();
    assert_eq!(report.examined, 0);
    assert_eq!(right.collector().len(), 1);
    assert_eq!(left.metrics().sweeps(), 1);
    assert_eq!(right.metrics().sweeps(), 0);
}

#[test]
fn test_identifiers_numbered_per_agent() {
    let mut left = named("left");
    let mut right = named("right");
    let a = left.symbols_mut().make_identifier('B', None).unwrap();
    let b = right.symbols_mut().make_identifier('B', None).unwrap();
    assert_eq!(left.symbols().describe(a), "B1");
    assert_eq!(right.symbols().describe(b), "B1");
}

#[test]
fn test_pool_limits_are_per_agent() {
    let config = AgentConfig {
        preference_pool_capacity: Some(1),
        ..AgentConfig::default()
    };
    let mut left = Agent::new(config.clone()).unwrap();
    let mut right = Agent::new(config).unwrap();

    for agent in [&mut left, &mut right] {
        let b = agent.symbols_mut().make_identifier('B', None).unwrap();
        let color = agent.symbols_mut().make_str_constant("color").unwrap();
        let red = agent.symbols_mut().make_str_constant("red").unwrap();
        agent
            .make_preference(PreferenceType::Acceptable, b, color, red, None)
            .unwrap();
        let err = agent
            .make_preference(PreferenceType::Reject, b, color, red, None)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
