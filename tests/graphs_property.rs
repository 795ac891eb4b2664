#[macro_use]
extern crate proptest;

use proptest::prelude::{Strategy, any, prop};
use serde_json::{Map, Value, json};

use scriptline::graphs::{GraphLoader, ScenarioStore, resolver};
use scriptline::types::is_reserved_token;

// Generators shared by graph property tests

/// Trigger tokens: short printable labels, excluding the reserved control
/// tokens.
fn token_strategy() -> impl Strategy<Value = String> {
    let base = prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,12}").unwrap();
    base.prop_filter("exclude reserved control tokens", |s| {
        !is_reserved_token(s)
    })
}

fn load(document: Value) -> std::sync::Arc<scriptline::graphs::ScenarioGraph> {
    let mut store = ScenarioStore::new();
    store.insert("prop", document);
    GraphLoader::new()
        .load(&store, "prop")
        .expect("generated scenario is valid")
}

/// Build a star-shaped scenario: `s0` fans out to one target per token,
/// optionally with a DEFAULT edge and a legacy next state.
fn star_scenario(tokens: &[String], with_default: bool, with_legacy: bool) -> Value {
    let mut on = Map::new();
    for (i, token) in tokens.iter().enumerate() {
        on.insert(token.clone(), json!(format!("t{i}")));
    }
    if with_default {
        on.insert("DEFAULT".into(), json!("fallback"));
    }

    let mut states = Map::new();
    let mut s0 = Map::new();
    if !on.is_empty() {
        s0.insert("on".into(), Value::Object(on));
    }
    if with_legacy {
        s0.insert("nextState".into(), json!("fallback"));
    }
    states.insert("s0".into(), Value::Object(s0));
    for i in 0..tokens.len() {
        states.insert(format!("t{i}"), json!({}));
    }
    states.insert("fallback".into(), json!({}));

    json!({ "initial": "s0", "states": states })
}

proptest! {
    /// An exact token always wins over the DEFAULT edge.
    #[test]
    fn prop_exact_token_beats_default(
        mut tokens in prop::collection::vec(token_strategy(), 1..6),
        with_legacy in any::<bool>(),
    ) {
        tokens.sort();
        tokens.dedup();
        let graph = load(star_scenario(&tokens, true, with_legacy));

        for (i, token) in tokens.iter().enumerate() {
            let target = resolver::resolve(&graph, "s0", Some(token)).unwrap();
            prop_assert_eq!(target, &format!("t{i}"));
        }
    }

    /// Unknown tokens land on DEFAULT when present, else the legacy path.
    #[test]
    fn prop_unknown_token_falls_back(
        mut tokens in prop::collection::vec(token_strategy(), 0..6),
        with_default in any::<bool>(),
        with_legacy in any::<bool>(),
    ) {
        tokens.sort();
        tokens.dedup();
        tokens.retain(|t| t != "zzz unknown");
        let graph = load(star_scenario(&tokens, with_default, with_legacy));

        let resolved = resolver::resolve(&graph, "s0", Some("zzz unknown"));
        if with_default || with_legacy {
            prop_assert_eq!(resolved.unwrap(), "fallback");
        } else {
            prop_assert!(resolved.is_none());
        }
    }

    /// Whatever resolves must exist in the graph (loader validation).
    #[test]
    fn prop_resolved_targets_exist(
        mut tokens in prop::collection::vec(token_strategy(), 0..6),
        probe in token_strategy(),
        with_default in any::<bool>(),
        with_legacy in any::<bool>(),
    ) {
        tokens.sort();
        tokens.dedup();
        let graph = load(star_scenario(&tokens, with_default, with_legacy));

        if let Some(target) = resolver::resolve(&graph, "s0", Some(&probe)) {
            prop_assert!(graph.contains(target));
        }
    }

    /// Derived options are never empty and never expose reserved tokens.
    #[test]
    fn prop_options_non_empty_and_unreserved(
        mut tokens in prop::collection::vec(token_strategy(), 0..6),
        with_default in any::<bool>(),
        with_legacy in any::<bool>(),
    ) {
        tokens.sort();
        tokens.dedup();
        let graph = load(star_scenario(&tokens, with_default, with_legacy));

        let options = resolver::response_options_for(&graph, "s0");
        prop_assert!(!options.is_empty());
        for option in &options {
            prop_assert!(!is_reserved_token(option));
        }
        if !tokens.is_empty() {
            prop_assert_eq!(options, tokens);
        }
    }
}
