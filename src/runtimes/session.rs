//! Mutable per-conversation session state.
//!
//! Everything the engine mutates while walking a scenario lives here, in
//! one place, so `reset` can be audited at a glance. The session never
//! touches the graph; it only remembers where the conversation is and
//! which guards are armed.

use rustc_hash::FxHashSet;

use crate::types::{SessionPhase, StateId};

/// The engine's mutable position within one conversation.
#[derive(Debug, Default)]
pub struct ConversationSession {
    /// Whether a call is idle, running, or ended.
    pub phase: SessionPhase,
    /// Current position in the graph; `None` before the first start.
    pub current_state_id: Option<StateId>,
    /// States whose side effects already ran this session.
    pub processed_state_ids: FxHashSet<StateId>,
    /// Armed after a customer message with options; cleared by `select`.
    pub awaiting_user_response: bool,
    /// Module ids whose verification completion has not arrived yet.
    pub pending_verifications: FxHashSet<String>,
    /// Set while the current transition came from an explicit selection,
    /// so the entered state does not echo a second agent line.
    pub user_initiated_transition: bool,
    /// Bumped on every reset; scheduled continuations carry the value they
    /// were created under and bail out when it no longer matches.
    pub generation: u64,
}

impl ConversationSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `state_id` already had its side effects applied.
    #[must_use]
    pub fn is_processed(&self, state_id: &str) -> bool {
        self.processed_state_ids.contains(state_id)
    }

    /// Move the session to `state_id` without touching guards.
    pub fn set_current_state(&mut self, state_id: impl Into<StateId>) {
        self.current_state_id = Some(state_id.into());
    }

    /// Wipe all per-call state and invalidate outstanding continuations.
    /// The phase goes back to `Idle`; the caller decides what happens to
    /// the transcript.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.current_state_id = None;
        self.processed_state_ids.clear();
        self.awaiting_user_response = false;
        self.pending_verifications.clear();
        self.user_initiated_transition = false;
        self.generation = self.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_state_and_bumps_generation() {
        let mut session = ConversationSession::new();
        session.phase = SessionPhase::Active;
        session.set_current_state("s3");
        session.processed_state_ids.insert("s0".into());
        session.awaiting_user_response = true;
        session.pending_verifications.insert("m1".into());
        let generation = session.generation;

        session.reset();

        assert_eq!(session.phase, SessionPhase::Idle);
        assert!(session.current_state_id.is_none());
        assert!(session.processed_state_ids.is_empty());
        assert!(!session.awaiting_user_response);
        assert!(session.pending_verifications.is_empty());
        assert_eq!(session.generation, generation + 1);
    }

    #[test]
    fn processed_tracking() {
        let mut session = ConversationSession::new();
        assert!(!session.is_processed("s0"));
        session.processed_state_ids.insert("s0".into());
        assert!(session.is_processed("s0"));
    }
}
