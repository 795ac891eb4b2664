//! Shared scenario fixtures and engine helpers for integration tests.

use std::sync::Arc;

use serde_json::{Value, json};

use scriptline::event_bus::EventHub;
use scriptline::graphs::{GraphLoader, ScenarioGraph, ScenarioStore};
use scriptline::runtimes::{ConversationEngine, EngineConfig};

/// Load a graph straight from a JSON document.
pub fn graph_from(id: &str, document: Value) -> Arc<ScenarioGraph> {
    let mut store = ScenarioStore::new();
    store.insert(id, document);
    GraphLoader::new()
        .load(&store, id)
        .expect("fixture scenario loads")
}

/// Engine with near-zero delays so tests stay fast, plus its hub.
pub fn test_engine(graph: Arc<ScenarioGraph>) -> (ConversationEngine, Arc<EventHub>) {
    let hub = EventHub::with_default_capacity();
    let config = EngineConfig::immediate()
        .with_completion_cooldown(std::time::Duration::from_millis(200));
    let engine = ConversationEngine::new(graph, Arc::clone(&hub), config)
        .expect("engine builds");
    (engine, hub)
}

/// Two-state script: a greeting the agent answers, then a closing system
/// message.
pub fn greeting_scenario() -> Arc<ScenarioGraph> {
    graph_from(
        "greeting",
        json!({
            "initial": "greet",
            "states": {
                "greet": {
                    "meta": { "customerText": "Hi" },
                    "on": { "Hello!": "done" }
                },
                "done": {
                    "meta": { "systemMessage": "Done" }
                }
            }
        }),
    )
}

/// Script with an inline verification module gating progression.
pub fn verification_scenario() -> Arc<ScenarioGraph> {
    graph_from(
        "verification",
        json!({
            "initial": "identify",
            "states": {
                "identify": {
                    "meta": {
                        "module": {
                            "id": "ident-check",
                            "type": "verification",
                            "title": "Identity check"
                        }
                    },
                    "requiresVerification": true,
                    "on": { "Continue": "verified" }
                },
                "verified": {
                    "meta": { "systemMessage": "Identity confirmed" }
                }
            }
        }),
    )
}

/// Script whose middle state auto-continues over a DEFAULT-only edge.
pub fn auto_continue_scenario() -> Arc<ScenarioGraph> {
    graph_from(
        "auto",
        json!({
            "initial": "start",
            "states": {
                "start": {
                    "meta": { "customerText": "My internet is down" },
                    "on": { "Let me check": "checking" }
                },
                "checking": {
                    "meta": { "systemMessage": "Running line diagnostics" },
                    "on": { "DEFAULT": "result" }
                },
                "result": {
                    "meta": { "agentText": "The line looks fine from here." }
                }
            }
        }),
    )
}
