//! In-memory scenario graph model and the raw wire format it is built
//! from.
//!
//! A [`ScenarioGraph`] is immutable once loaded: the engine only ever
//! reads it, and one graph is safely shared across sessions behind an
//! `Arc`. Construction goes through [`ScenarioGraph::from_raw`], which
//! normalizes the two legacy key spellings (`initial` vs `initialState`)
//! and eagerly validates every transition target so malformed graphs fail
//! at load time instead of mid-conversation.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;

use super::loader::GraphError;
use crate::scanner::{FieldKind, SensitiveField};
use crate::types::{ModuleKind, ScenarioStatus, StateId, TOKEN_DEFAULT};

// ── Loaded model ───────────────────────────────────────────────────────

/// A declarative, read-only conversation script.
#[derive(Clone, Debug)]
pub struct ScenarioGraph {
    /// Scenario identifier.
    pub id: String,
    /// Canonical entry state.
    pub initial_state_id: StateId,
    /// Lifecycle status the scenario was stored with.
    pub status: ScenarioStatus,
    /// Scenario-wide switch disabling scheduled auto-continuation.
    pub prevent_auto_continue: bool,
    /// All states, keyed by id.
    pub states: FxHashMap<StateId, StateNode>,
}

impl ScenarioGraph {
    /// Look up a state by id.
    #[must_use]
    pub fn state(&self, state_id: &str) -> Option<&StateNode> {
        self.states.get(state_id)
    }

    /// Returns `true` if `state_id` exists in this graph.
    #[must_use]
    pub fn contains(&self, state_id: &str) -> bool {
        self.states.contains_key(state_id)
    }
}

/// One point in the scripted dialogue. Immutable once loaded.
#[derive(Clone, Debug, Default)]
pub struct StateNode {
    /// Presentation payload for this state.
    pub meta: StateMeta,
    /// Outgoing transitions in authored order, keyed by trigger token.
    pub transitions: Vec<(String, StateId)>,
    /// Fallback for single-path states authored without a transition map.
    pub legacy_next_state: Option<StateId>,
    /// Whether entering this state demands identity verification.
    pub requires_verification: bool,
}

impl StateNode {
    /// Find the target for an exact trigger token.
    #[must_use]
    pub fn transition(&self, token: &str) -> Option<&StateId> {
        self.transitions
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, target)| target)
    }

    /// Returns `true` if the state can advance without user input
    /// (a `DEFAULT` transition or a legacy next state).
    #[must_use]
    pub fn has_default_path(&self) -> bool {
        self.transition(TOKEN_DEFAULT).is_some() || self.legacy_next_state.is_some()
    }
}

/// Presentation payload of a state.
#[derive(Clone, Debug, Default)]
pub struct StateMeta {
    pub agent_text: Option<String>,
    pub customer_text: Option<String>,
    pub system_message: Option<String>,
    /// Explicitly authored response options; when present and non-empty
    /// they override any derivation from the transition map.
    pub response_options: Option<Vec<String>>,
    /// Sensitive fields authored directly on the state.
    pub sensitive_fields: Vec<SensitiveField>,
    /// Interactive module embedded in this state.
    pub module: Option<ModuleDescriptor>,
    /// Per-state override of the scenario-wide auto-continue switch.
    pub prevent_auto_continue: bool,
}

/// Static description of an embedded module, as authored in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleDescriptor {
    pub id: String,
    pub kind: ModuleKind,
    /// Render within the transcript flow instead of as an overlay.
    /// Verification modules are always inline.
    pub inline: bool,
    pub title: Option<String>,
    /// Opaque module-specific payload, handed to the module UI untouched.
    pub payload: Value,
}

// ── Raw wire format ────────────────────────────────────────────────────

/// Top-level scenario document as stored (external JSON format).
#[derive(Debug, Deserialize)]
pub(crate) struct RawScenario {
    pub initial: Option<String>,
    #[serde(rename = "initialState")]
    pub initial_state: Option<String>,
    #[serde(default)]
    pub status: ScenarioStatus,
    #[serde(rename = "preventAutoContinue")]
    pub prevent_auto_continue: Option<bool>,
    pub states: Option<FxHashMap<String, RawState>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawState {
    pub meta: Option<RawMeta>,
    /// Transition map; `serde_json`'s preserve_order feature keeps the
    /// authored token order, which response-option derivation depends on.
    pub on: Option<serde_json::Map<String, Value>>,
    #[serde(rename = "nextState")]
    pub next_state: Option<String>,
    #[serde(rename = "requiresVerification", default)]
    pub requires_verification: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMeta {
    #[serde(rename = "agentText")]
    pub agent_text: Option<String>,
    #[serde(rename = "customerText")]
    pub customer_text: Option<String>,
    #[serde(rename = "systemMessage")]
    pub system_message: Option<String>,
    #[serde(rename = "responseOptions")]
    pub response_options: Option<Vec<String>>,
    #[serde(rename = "sensitiveFields")]
    pub sensitive_fields: Option<Vec<RawSensitiveField>>,
    pub module: Option<RawModule>,
    #[serde(rename = "preventAutoContinue", default)]
    pub prevent_auto_continue: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSensitiveField {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub value: String,
    #[serde(rename = "requiresVerification", default)]
    pub requires_verification: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawModule {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub inline: Option<bool>,
    pub title: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

// ── Construction & validation ──────────────────────────────────────────

impl ScenarioGraph {
    /// Build a canonical graph from a raw scenario document.
    ///
    /// Normalizes `initial`/`initialState`, converts transition maps to
    /// ordered pairs, and validates referential integrity: the initial
    /// state and every transition or legacy target must exist.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Malformed`] when the document is missing its
    /// states or initial state, or references a state that does not exist.
    pub(crate) fn from_raw(id: &str, raw: RawScenario) -> Result<Self, GraphError> {
        let malformed = |detail: String| GraphError::Malformed {
            scenario_id: id.to_string(),
            detail,
        };

        let initial_state_id = raw
            .initial_state
            .or(raw.initial)
            .ok_or_else(|| malformed("missing initial state id".into()))?;

        let raw_states = raw
            .states
            .ok_or_else(|| malformed("missing states map".into()))?;

        let mut states = FxHashMap::default();
        for (state_id, raw_state) in raw_states {
            let mut transitions = Vec::new();
            if let Some(on) = raw_state.on {
                for (token, target) in on {
                    let target = target.as_str().ok_or_else(|| {
                        malformed(format!(
                            "state '{state_id}': transition '{token}' target is not a string"
                        ))
                    })?;
                    transitions.push((token, target.to_string()));
                }
            }

            let meta = match raw_state.meta {
                Some(raw_meta) => StateMeta {
                    agent_text: raw_meta.agent_text,
                    customer_text: raw_meta.customer_text,
                    system_message: raw_meta.system_message,
                    response_options: raw_meta.response_options,
                    sensitive_fields: raw_meta
                        .sensitive_fields
                        .unwrap_or_default()
                        .into_iter()
                        .map(|f| {
                            SensitiveField::pending(f.kind, f.value, f.requires_verification)
                        })
                        .collect(),
                    module: raw_meta.module.map(|m| {
                        let inline = m.kind.is_verification() || m.inline.unwrap_or(false);
                        ModuleDescriptor {
                            id: m.id,
                            kind: m.kind,
                            inline,
                            title: m.title,
                            payload: m.payload,
                        }
                    }),
                    prevent_auto_continue: raw_meta.prevent_auto_continue,
                },
                None => StateMeta::default(),
            };

            states.insert(
                state_id,
                StateNode {
                    meta,
                    transitions,
                    legacy_next_state: raw_state.next_state,
                    requires_verification: raw_state.requires_verification,
                },
            );
        }

        let graph = Self {
            id: id.to_string(),
            initial_state_id,
            status: raw.status,
            prevent_auto_continue: raw.prevent_auto_continue.unwrap_or(false),
            states,
        };
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<(), GraphError> {
        let malformed = |detail: String| GraphError::Malformed {
            scenario_id: self.id.clone(),
            detail,
        };

        if !self.contains(&self.initial_state_id) {
            return Err(malformed(format!(
                "initial state '{}' not present in states",
                self.initial_state_id
            )));
        }
        for (state_id, node) in &self.states {
            for (token, target) in &node.transitions {
                if !self.contains(target) {
                    return Err(malformed(format!(
                        "state '{state_id}': transition '{token}' targets unknown state '{target}'"
                    )));
                }
            }
            if let Some(target) = &node.legacy_next_state {
                if !self.contains(target) {
                    return Err(malformed(format!(
                        "state '{state_id}': legacy next state '{target}' does not exist"
                    )));
                }
            }
        }
        Ok(())
    }
}
