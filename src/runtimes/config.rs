//! Engine timing and behavior configuration.
//!
//! Defaults match the pacing of a live-assist UI: a short settle delay so
//! a rendered selection is visible before the transcript moves, and a
//! longer pause after verification so the agent can read the result.
//! Everything is overridable programmatically or through `SCRIPTLINE_*`
//! environment variables (a `.env` file is honored via dotenvy).

use std::time::Duration;

/// Tunable knobs of the [`ConversationEngine`](super::ConversationEngine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause between accepting a selection and mutating the session.
    pub select_settle_delay: Duration,
    /// Pause between a verification completion and the scheduled
    /// auto-advance.
    pub verification_resume_delay: Duration,
    /// Window within which duplicate completion signals for the same
    /// module/state pair are ignored.
    pub completion_cooldown: Duration,
    /// Globally disable scheduled auto-continuation, regardless of what
    /// the scenario says.
    pub prevent_auto_continue: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            select_settle_delay: Duration::from_millis(120),
            verification_resume_delay: Duration::from_millis(1200),
            completion_cooldown: Duration::from_millis(2000),
            prevent_auto_continue: false,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults merged with `SCRIPTLINE_SETTLE_MS`, `SCRIPTLINE_RESUME_MS`,
    /// `SCRIPTLINE_COOLDOWN_MS` and `SCRIPTLINE_NO_AUTO_CONTINUE` from the
    /// environment. Unparseable values fall back to the default silently;
    /// configuration must never take the engine down.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Some(ms) = env_millis("SCRIPTLINE_SETTLE_MS") {
            config.select_settle_delay = ms;
        }
        if let Some(ms) = env_millis("SCRIPTLINE_RESUME_MS") {
            config.verification_resume_delay = ms;
        }
        if let Some(ms) = env_millis("SCRIPTLINE_COOLDOWN_MS") {
            config.completion_cooldown = ms;
        }
        if let Ok(raw) = std::env::var("SCRIPTLINE_NO_AUTO_CONTINUE") {
            config.prevent_auto_continue = matches!(raw.as_str(), "1" | "true" | "yes");
        }
        config
    }

    /// Zero delays, for tests that drive the engine synchronously.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            select_settle_delay: Duration::ZERO,
            verification_resume_delay: Duration::ZERO,
            completion_cooldown: Duration::from_millis(2000),
            prevent_auto_continue: false,
        }
    }

    #[must_use]
    pub fn with_select_settle_delay(mut self, delay: Duration) -> Self {
        self.select_settle_delay = delay;
        self
    }

    #[must_use]
    pub fn with_verification_resume_delay(mut self, delay: Duration) -> Self {
        self.verification_resume_delay = delay;
        self
    }

    #[must_use]
    pub fn with_completion_cooldown(mut self, window: Duration) -> Self {
        self.completion_cooldown = window;
        self
    }

    #[must_use]
    pub fn with_prevent_auto_continue(mut self, prevent: bool) -> Self {
        self.prevent_auto_continue = prevent;
        self
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(key, %raw, "ignoring unparseable duration override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.select_settle_delay < config.verification_resume_delay);
        assert!(!config.prevent_auto_continue);
    }

    #[test]
    fn builders_override_fields() {
        let config = EngineConfig::new()
            .with_select_settle_delay(Duration::ZERO)
            .with_prevent_auto_continue(true);
        assert_eq!(config.select_settle_delay, Duration::ZERO);
        assert!(config.prevent_auto_continue);
    }

    #[test]
    fn immediate_has_no_delays() {
        let config = EngineConfig::immediate();
        assert_eq!(config.select_settle_delay, Duration::ZERO);
        assert_eq!(config.verification_resume_delay, Duration::ZERO);
    }
}
