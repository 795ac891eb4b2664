//! Core types for the scriptline conversation engine.
//!
//! This module defines the fundamental identifiers used throughout the
//! system: transition tokens, transcript senders, session phases, scenario
//! lifecycle status, and module kinds. These are the core domain concepts
//! that define what a scripted conversation *is*.
//!
//! For runtime execution types (sessions, engine configuration), see
//! [`crate::runtimes`].
//!
//! # Examples
//!
//! ```rust
//! use scriptline::types::{ModuleKind, Sender, SessionPhase};
//!
//! let sender = Sender::Customer;
//! assert_eq!(sender.to_string(), "customer");
//!
//! let kind = ModuleKind::from("contract");
//! assert_eq!(kind, ModuleKind::Contract);
//!
//! assert_eq!(SessionPhase::default(), SessionPhase::Idle);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a state within a scenario graph.
pub type StateId = String;

/// Reserved transition token: the catch-all fallback edge out of a state.
pub const TOKEN_DEFAULT: &str = "DEFAULT";

/// Reserved transition token: the edge taken when a call is started.
pub const TOKEN_START_CALL: &str = "START_CALL";

/// Returns `true` for control tokens that are never presented to the user
/// as response options.
#[must_use]
pub fn is_reserved_token(token: &str) -> bool {
    token == TOKEN_DEFAULT || token == TOKEN_START_CALL
}

/// Originator of a transcript entry.
///
/// Every [`Message`](crate::message::Message) carries exactly one sender.
/// `System` entries are engine-generated (announcements, module
/// availability); `Agent` and `Customer` mirror the two human sides of the
/// scripted call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    System,
    Agent,
    Customer,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Agent => write!(f, "agent"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

/// Session-level lifecycle of a conversation.
///
/// The engine's position *inside* the graph is tracked separately by
/// `current_state_id`; this enum only describes whether a call is running
/// at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No call in progress; `start()` is accepted.
    #[default]
    Idle,
    /// A call is running; `select()` is accepted subject to input guards.
    Active,
    /// The call was ended; only `reset()` leaves this phase.
    Ended,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Lifecycle status of a stored scenario.
///
/// `Disabled` scenarios are present in the store but refuse to load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    #[default]
    Production,
    Testing,
    Development,
    Disabled,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
            Self::Development => write!(f, "development"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Kind of an interactive module embedded in a scenario state.
///
/// Verification modules get special treatment from the engine: they are
/// always rendered inline in the transcript and their completion
/// auto-advances the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Verification,
    Contract,
    Information,
    Nachbearbeitung,
    /// Module kind not known to the engine; carried through untouched.
    #[serde(untagged)]
    Other(String),
}

impl ModuleKind {
    /// Returns `true` if this is a verification module.
    #[must_use]
    pub fn is_verification(&self) -> bool {
        matches!(self, Self::Verification)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verification => write!(f, "verification"),
            Self::Contract => write!(f, "contract"),
            Self::Information => write!(f, "information"),
            Self::Nachbearbeitung => write!(f, "nachbearbeitung"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

// Developer experience: allow string literals where a ModuleKind is expected.
impl From<&str> for ModuleKind {
    fn from(s: &str) -> Self {
        match s {
            "verification" => ModuleKind::Verification,
            "contract" => ModuleKind::Contract,
            "information" => ModuleKind::Information,
            "nachbearbeitung" => ModuleKind::Nachbearbeitung,
            other => ModuleKind::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tokens() {
        assert!(is_reserved_token(TOKEN_DEFAULT));
        assert!(is_reserved_token(TOKEN_START_CALL));
        assert!(!is_reserved_token("Yes"));
        assert!(!is_reserved_token("default"));
    }

    #[test]
    fn module_kind_round_trip() {
        assert_eq!(ModuleKind::from("verification"), ModuleKind::Verification);
        assert_eq!(
            ModuleKind::from("tariff"),
            ModuleKind::Other("tariff".to_string())
        );
        assert_eq!(ModuleKind::Other("tariff".into()).to_string(), "tariff");
    }

    #[test]
    fn sender_serde_is_lowercase() {
        let json = serde_json::to_string(&Sender::Customer).unwrap();
        assert_eq!(json, "\"customer\"");
    }
}
