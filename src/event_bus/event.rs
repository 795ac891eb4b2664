//! Typed bridge signals exchanged between the engine, module UIs, and
//! cross-cutting consumers.
//!
//! These replace the window-level custom events of ad hoc agent-assist
//! frontends with a closed, serializable enum: subscribers match on
//! variants instead of sniffing untyped payload shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::ModuleRef;
use crate::notify::Notification;
use crate::types::{ModuleKind, StateId};

/// A signal on the event bridge.
///
/// The engine publishes progression signals (`ModuleTrigger`,
/// `Notification`) and subscribes to completion/control signals
/// (`ModuleCompleted`, `VerificationComplete`, `VerificationSuccessful`,
/// `JumpToState`). External collaborators are free to do the reverse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BridgeEvent {
    /// A module has been activated for the current state.
    ModuleTrigger { module: ModuleRef },
    /// A module finished and carries its result payload.
    ModuleCompleted {
        module_id: String,
        module_kind: ModuleKind,
        result: Value,
    },
    /// A verification module's form was submitted.
    VerificationComplete {
        module_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        instance_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
    /// A verification module reported a successful check.
    VerificationSuccessful {
        module_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        instance_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
    /// The hosting UI switched to another scenario.
    ScenarioChange { scenario: String },
    /// Debug/authoring control: move the session to a specific state.
    JumpToState { state_id: StateId },
    /// Fire-and-forget toast for notification consumers.
    Notification { notification: Notification },
}

impl BridgeEvent {
    /// Shorthand for a completion signal.
    #[must_use]
    pub fn module_completed(
        module_id: impl Into<String>,
        module_kind: ModuleKind,
        result: Value,
    ) -> Self {
        Self::ModuleCompleted {
            module_id: module_id.into(),
            module_kind,
            result,
        }
    }

    /// Shorthand for a verification submission without correlation ids.
    #[must_use]
    pub fn verification_complete(module_id: impl Into<String>) -> Self {
        Self::VerificationComplete {
            module_id: module_id.into(),
            instance_id: None,
            event_id: None,
        }
    }

    /// Shorthand for a jump-to-state control signal.
    #[must_use]
    pub fn jump_to_state(state_id: impl Into<String>) -> Self {
        Self::JumpToState {
            state_id: state_id.into(),
        }
    }

    /// Stable label of this signal, matching its wire name.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ModuleTrigger { .. } => "module-trigger",
            Self::ModuleCompleted { .. } => "module-completed",
            Self::VerificationComplete { .. } => "verification-complete",
            Self::VerificationSuccessful { .. } => "verification-successful",
            Self::ScenarioChange { .. } => "scenario-change",
            Self::JumpToState { .. } => "jump-to-state",
            Self::Notification { .. } => "notification",
        }
    }
}

impl fmt::Display for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleTrigger { module } => {
                write!(f, "module-trigger {} ({})", module.id, module.kind)
            }
            Self::ModuleCompleted { module_id, .. } => write!(f, "module-completed {module_id}"),
            Self::VerificationComplete { module_id, .. } => {
                write!(f, "verification-complete {module_id}")
            }
            Self::VerificationSuccessful { module_id, .. } => {
                write!(f, "verification-successful {module_id}")
            }
            Self::ScenarioChange { scenario } => write!(f, "scenario-change {scenario}"),
            Self::JumpToState { state_id } => write!(f, "jump-to-state {state_id}"),
            Self::Notification { notification } => {
                write!(f, "notification: {}", notification.title)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_kebab_case_tags() {
        let event = BridgeEvent::verification_complete("m1");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"verification-complete\""));
        let parsed: BridgeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn label_matches_wire_name() {
        let event = BridgeEvent::jump_to_state("s2");
        assert_eq!(event.label(), "jump-to-state");
    }
}
