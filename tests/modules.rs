use serde_json::{Value, json};

use scriptline::event_bus::{BridgeEvent, EventHub};
use scriptline::graphs::{ModuleDescriptor, StateMeta, StateNode};
use scriptline::modules::{ModuleChange, ModuleLifecycleManager};
use scriptline::types::ModuleKind;

fn state_with_module(id: &str, kind: ModuleKind, inline: bool) -> StateNode {
    StateNode {
        meta: StateMeta {
            module: Some(ModuleDescriptor {
                id: id.to_string(),
                kind,
                inline,
                title: Some("Test module".into()),
                payload: Value::Null,
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn module_triggers_at_most_once_per_session() {
    let hub = EventHub::with_default_capacity();
    let mut manager = ModuleLifecycleManager::new(hub);
    let node = state_with_module("contract-calc", ModuleKind::Contract, false);

    let first = manager.on_state_entered("s1", &node);
    assert_eq!(first.unwrap().id, "contract-calc");
    assert!(manager.is_triggered("contract-calc"));

    // Re-entering the state, or another state carrying the same module id,
    // must not reactivate it.
    assert!(manager.on_state_entered("s1", &node).is_none());
    assert!(manager.on_state_entered("s2", &node).is_none());
    assert_eq!(manager.active().len(), 1);
}

#[test]
fn trigger_publishes_on_the_bridge() {
    let hub = EventHub::with_default_capacity();
    let mut stream = hub.subscribe();
    let mut manager = ModuleLifecycleManager::new(hub);
    let node = state_with_module("info-panel", ModuleKind::Information, true);

    manager.on_state_entered("s1", &node);
    match stream.try_recv().unwrap() {
        BridgeEvent::ModuleTrigger { module } => {
            assert_eq!(module.id, "info-panel");
            assert!(module.inline);
        }
        other => panic!("unexpected event: {other}"),
    }
}

#[test]
fn completion_moves_module_to_history_and_publishes() {
    let hub = EventHub::with_default_capacity();
    let mut stream = hub.subscribe();
    let mut manager = ModuleLifecycleManager::new(hub);
    let node = state_with_module("contract-calc", ModuleKind::Contract, false);

    manager.on_state_entered("s1", &node);
    let completed = manager
        .complete("contract-calc", json!({"tariff": "L"}))
        .unwrap();
    assert!(completed.completed);
    assert_eq!(completed.result, Some(json!({"tariff": "L"})));
    assert!(manager.active().is_empty());

    let history = manager.history();
    assert_eq!(history.len(), 2);
    assert!(matches!(history[0].change, ModuleChange::Triggered));
    assert!(matches!(history[1].change, ModuleChange::Completed { .. }));

    // trigger, then completion
    stream.try_recv().unwrap();
    match stream.try_recv().unwrap() {
        BridgeEvent::ModuleCompleted {
            module_id, result, ..
        } => {
            assert_eq!(module_id, "contract-calc");
            assert_eq!(result, json!({"tariff": "L"}));
        }
        other => panic!("unexpected event: {other}"),
    }
}

#[test]
fn completing_an_unknown_module_fails() {
    let hub = EventHub::with_default_capacity();
    let mut manager = ModuleLifecycleManager::new(hub);
    assert!(manager.complete("ghost", Value::Null).is_err());
}

#[test]
fn reset_allows_retriggering() {
    let hub = EventHub::with_default_capacity();
    let mut manager = ModuleLifecycleManager::new(hub);
    let node = state_with_module("contract-calc", ModuleKind::Contract, false);

    manager.on_state_entered("s1", &node);
    manager.reset();

    assert!(!manager.is_triggered("contract-calc"));
    assert!(manager.history().is_empty());
    assert!(manager.on_state_entered("s1", &node).is_some());
}
