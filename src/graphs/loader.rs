//! Lazy materialization of scenario graphs from the store.
//!
//! The loader resolves a scenario id to a canonical [`ScenarioGraph`],
//! normalizing legacy field spellings, merging per-scenario default
//! overrides, and caching the result. Validation is eager: a graph that
//! references a missing state never leaves this module.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::model::{RawScenario, ScenarioGraph};
use super::store::ScenarioStore;
use crate::types::ScenarioStatus;

/// Failures resolving a scenario id to a usable graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("scenario not found: {scenario_id}")]
    #[diagnostic(code(scriptline::graphs::not_found))]
    NotFound { scenario_id: String },

    #[error("scenario unavailable: {scenario_id} is disabled")]
    #[diagnostic(
        code(scriptline::graphs::unavailable),
        help("Re-enable the scenario in the store or pick another one.")
    )]
    Unavailable { scenario_id: String },

    #[error("malformed scenario '{scenario_id}': {detail}")]
    #[diagnostic(
        code(scriptline::graphs::malformed),
        help("Fix the scenario document; every transition target must name an existing state.")
    )]
    Malformed { scenario_id: String, detail: String },
}

/// Per-scenario defaults applied when the stored document omits a value.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScenarioOverrides {
    /// Force the scenario-wide auto-continue switch.
    pub prevent_auto_continue: Option<bool>,
}

/// Resolves scenario ids to cached, validated [`ScenarioGraph`]s.
#[derive(Debug, Default)]
pub struct GraphLoader {
    cache: FxHashMap<String, Arc<ScenarioGraph>>,
    overrides: FxHashMap<String, ScenarioOverrides>,
}

impl GraphLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register default overrides for one scenario. Overrides only apply
    /// where the stored document leaves the value unset.
    #[must_use]
    pub fn with_override(mut self, scenario_id: impl Into<String>, ov: ScenarioOverrides) -> Self {
        self.overrides.insert(scenario_id.into(), ov);
        self
    }

    /// Resolve `scenario_id` against the store.
    ///
    /// Idempotent: repeated loads of the same id return the cached graph.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NotFound`] when the store has no such entry.
    /// - [`GraphError::Unavailable`] when the entry is disabled.
    /// - [`GraphError::Malformed`] when the document fails to parse or
    ///   validate; nothing is cached in that case.
    pub fn load(
        &mut self,
        store: &ScenarioStore,
        scenario_id: &str,
    ) -> Result<Arc<ScenarioGraph>, GraphError> {
        if let Some(graph) = self.cache.get(scenario_id) {
            return Ok(Arc::clone(graph));
        }

        let entry = store.get(scenario_id).ok_or_else(|| GraphError::NotFound {
            scenario_id: scenario_id.to_string(),
        })?;
        if entry.status == ScenarioStatus::Disabled {
            return Err(GraphError::Unavailable {
                scenario_id: scenario_id.to_string(),
            });
        }

        let mut raw: RawScenario =
            serde_json::from_value(entry.document.clone()).map_err(|e| GraphError::Malformed {
                scenario_id: scenario_id.to_string(),
                detail: e.to_string(),
            })?;

        // Status lives on the store entry; a status inside the document is
        // advisory and the store wins.
        raw.status = entry.status;

        if let Some(ov) = self.overrides.get(scenario_id) {
            if raw.prevent_auto_continue.is_none() {
                raw.prevent_auto_continue = ov.prevent_auto_continue;
            }
        }

        let graph = Arc::new(ScenarioGraph::from_raw(scenario_id, raw)?);
        tracing::debug!(
            scenario_id,
            states = graph.states.len(),
            initial = %graph.initial_state_id,
            "scenario graph loaded"
        );
        self.cache
            .insert(scenario_id.to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    /// Drop one cached graph so the next load re-reads the store.
    pub fn invalidate(&mut self, scenario_id: &str) {
        self.cache.remove(scenario_id);
    }

    /// Drop the whole cache.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
