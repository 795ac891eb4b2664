//! Module lifecycle tracking: trigger → active → complete.
//!
//! Interactive modules (verification forms, contract calculators, ...)
//! are declared on scenario states and live their own lifecycle alongside
//! the conversation. The manager enforces at-most-once activation per
//! module id for the lifetime of a session (re-entering a state after a
//! re-render must not re-prompt the user) and publishes completions on
//! the event bridge so the engine can resume progression.
//!
//! The triggered set is owned here, per session. It is deliberately not
//! process-global: two sessions running the same scenario must not see
//! each other's module state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::event_bus::{BridgeEvent, EventHub};
use crate::graphs::StateNode;
use crate::types::{ModuleKind, StateId};

/// A live reference to a triggered module instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub id: String,
    pub kind: ModuleKind,
    /// State whose entry triggered this module.
    pub source_state_id: StateId,
    /// Rendered within the transcript rather than as an overlay.
    pub inline: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ModuleRef {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: ModuleKind,
        source_state_id: impl Into<String>,
        inline: bool,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            source_state_id: source_state_id.into(),
            inline,
            completed: false,
            result: None,
        }
    }
}

/// One entry in the per-session module history log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleHistoryEntry {
    pub at: DateTime<Utc>,
    pub module_id: String,
    pub kind: ModuleKind,
    pub change: ModuleChange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleChange {
    Triggered,
    Completed { result: Value },
}

/// Failures in the module lifecycle.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("unknown module: {module_id}")]
    Unknown { module_id: String },
}

/// Per-session module lifecycle manager.
pub struct ModuleLifecycleManager {
    hub: Arc<EventHub>,
    triggered: FxHashSet<String>,
    refs: FxHashMap<String, ModuleRef>,
    active: Vec<String>,
    history: Vec<ModuleHistoryEntry>,
}

impl ModuleLifecycleManager {
    #[must_use]
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self {
            hub,
            triggered: FxHashSet::default(),
            refs: FxHashMap::default(),
            active: Vec::new(),
            history: Vec::new(),
        }
    }

    /// React to the engine entering `state_id`.
    ///
    /// If the state declares a module whose id has not been triggered in
    /// this session, the module is triggered: recorded in history, marked
    /// active when not inline, and announced on the bridge. Returns the
    /// fresh [`ModuleRef`] so the engine can embed it in the transcript;
    /// returns `None` for states without modules or on re-entry.
    pub fn on_state_entered(&mut self, state_id: &str, node: &StateNode) -> Option<ModuleRef> {
        let descriptor = node.meta.module.as_ref()?;
        if self.triggered.contains(&descriptor.id) {
            tracing::debug!(module_id = %descriptor.id, state_id, "module already triggered, skipping");
            return None;
        }

        let module = ModuleRef::new(
            descriptor.id.clone(),
            descriptor.kind.clone(),
            state_id,
            descriptor.inline,
        );
        self.triggered.insert(module.id.clone());
        self.refs.insert(module.id.clone(), module.clone());
        if !module.inline {
            self.active.push(module.id.clone());
        }
        self.history.push(ModuleHistoryEntry {
            at: Utc::now(),
            module_id: module.id.clone(),
            kind: module.kind.clone(),
            change: ModuleChange::Triggered,
        });
        self.hub.publish(BridgeEvent::ModuleTrigger {
            module: module.clone(),
        });
        Some(module)
    }

    /// Complete a triggered module with its result payload.
    ///
    /// Removes the module from the active list, records the result in
    /// history, and publishes `module-completed` on the bridge, the sole
    /// feedback path back into the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Unknown`] when no module with this id was
    /// ever triggered in the session.
    pub fn complete(&mut self, module_id: &str, result: Value) -> Result<ModuleRef, ModuleError> {
        let module = self
            .refs
            .get_mut(module_id)
            .ok_or_else(|| ModuleError::Unknown {
                module_id: module_id.to_string(),
            })?;
        module.completed = true;
        module.result = Some(result.clone());
        let completed = module.clone();

        self.active.retain(|id| id != module_id);
        self.history.push(ModuleHistoryEntry {
            at: Utc::now(),
            module_id: completed.id.clone(),
            kind: completed.kind.clone(),
            change: ModuleChange::Completed { result },
        });
        self.hub.publish(BridgeEvent::module_completed(
            completed.id.clone(),
            completed.kind.clone(),
            completed.result.clone().unwrap_or(Value::Null),
        ));
        Ok(completed)
    }

    /// Returns `true` if `module_id` was triggered at any point this
    /// session.
    #[must_use]
    pub fn is_triggered(&self, module_id: &str) -> bool {
        self.triggered.contains(module_id)
    }

    /// Modules currently active (triggered, not inline, not completed).
    #[must_use]
    pub fn active(&self) -> Vec<&ModuleRef> {
        self.active
            .iter()
            .filter_map(|id| self.refs.get(id))
            .collect()
    }

    /// The full trigger/completion history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ModuleHistoryEntry] {
        &self.history
    }

    /// Look up a triggered module by id.
    #[must_use]
    pub fn get(&self, module_id: &str) -> Option<&ModuleRef> {
        self.refs.get(module_id)
    }

    /// Forget everything; called on session reset.
    pub fn reset(&mut self) {
        self.triggered.clear();
        self.refs.clear();
        self.active.clear();
        self.history.clear();
    }
}
