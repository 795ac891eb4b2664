//! Transition resolution and response-option derivation.
//!
//! Pure functions over a loaded [`ScenarioGraph`]; all session state lives
//! in the engine. The precedence rules here are contractual; the UI and
//! the auto-continuation machinery both rely on them.

use super::model::ScenarioGraph;
use crate::types::{StateId, TOKEN_DEFAULT, is_reserved_token};

/// Synthetic option offered for legacy single-path states.
pub const OPTION_CONTINUE: &str = "Continue";

/// Synthetic option guaranteeing no state is a dead end in the UI.
pub const OPTION_ACKNOWLEDGE: &str = "Acknowledge";

/// Compute the next state for `token` out of `state_id`.
///
/// Precedence:
/// 1. exact transition for `token`
/// 2. the state's `DEFAULT` transition
/// 3. the legacy single-path next state
/// 4. `None`: the caller must treat the state as terminal/failed
#[must_use]
pub fn resolve<'a>(
    graph: &'a ScenarioGraph,
    state_id: &str,
    token: Option<&str>,
) -> Option<&'a StateId> {
    let node = graph.state(state_id)?;
    if let Some(token) = token {
        if let Some(target) = node.transition(token) {
            return Some(target);
        }
    }
    if let Some(target) = node.transition(TOKEN_DEFAULT) {
        return Some(target);
    }
    node.legacy_next_state.as_ref()
}

/// Derive the response options presented for `state_id`.
///
/// Precedence:
/// 1. explicitly authored options, verbatim and in order
/// 2. transition tokens except the reserved control tokens, authored order
/// 3. `["Continue"]` when only a legacy next state exists
/// 4. `["Acknowledge"]`
#[must_use]
pub fn response_options_for(graph: &ScenarioGraph, state_id: &str) -> Vec<String> {
    let Some(node) = graph.state(state_id) else {
        return vec![OPTION_ACKNOWLEDGE.to_string()];
    };

    if let Some(options) = &node.meta.response_options {
        if !options.is_empty() {
            return options.clone();
        }
    }

    let tokens: Vec<String> = node
        .transitions
        .iter()
        .filter(|(token, _)| !is_reserved_token(token))
        .map(|(token, _)| token.clone())
        .collect();
    if !tokens.is_empty() {
        return tokens;
    }

    if node.legacy_next_state.is_some() {
        return vec![OPTION_CONTINUE.to_string()];
    }

    vec![OPTION_ACKNOWLEDGE.to_string()]
}
