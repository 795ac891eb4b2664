//! Formatting helpers for bridge events and a tracing bootstrap.
//!
//! Sinks delegate rendering to a [`TelemetryFormatter`] so output targets
//! stay agnostic of presentation. [`init_tracing`] wires up the standard
//! `tracing-subscriber` stack for binaries and examples embedding the
//! engine.

use std::io::IsTerminal;

use crate::event_bus::BridgeEvent;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const RESET_COLOR: &str = "\x1b[0m";

/// Formatter color mode for telemetry output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    /// Auto-detect TTY capability (checks `stderr.is_terminal()`)
    #[default]
    Auto,
    /// Always include ANSI color codes
    Colored,
    /// Never include color codes (for logs/files)
    Plain,
}

impl FormatterMode {
    /// Returns true if this mode should use colored output.
    ///
    /// For `Auto` mode, performs TTY detection on each call.
    #[must_use]
    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Rendered output for a telemetry item that can be consumed by sinks.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub lines: Vec<String>,
}

impl EventRender {
    #[must_use]
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &BridgeEvent) -> EventRender;
}

/// Plain text formatter with optional ANSI color codes.
#[derive(Debug, Default)]
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    /// Create a new formatter with auto-detected color mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: FormatterMode::Auto,
        }
    }

    /// Create a new formatter with explicit color mode.
    #[must_use]
    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &BridgeEvent) -> EventRender {
        let label = event.label();
        let line = if self.mode.is_colored() {
            format!("{CONTEXT_COLOR}[{label}]{RESET_COLOR} {event}\n")
        } else {
            format!("[{label}] {event}\n")
        };
        EventRender { lines: vec![line] }
    }
}

/// Install a default tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_has_no_ansi() {
        let formatter = PlainFormatter::with_mode(FormatterMode::Plain);
        let event = BridgeEvent::jump_to_state("s1");
        let rendered = formatter.render_event(&event).join_lines();
        assert!(!rendered.contains("\x1b["));
        assert!(rendered.contains("jump-to-state"));
    }

    #[test]
    fn colored_mode_wraps_label() {
        let formatter = PlainFormatter::with_mode(FormatterMode::Colored);
        let event = BridgeEvent::jump_to_state("s1");
        let rendered = formatter.render_event(&event).join_lines();
        assert!(rendered.contains(CONTEXT_COLOR));
    }
}
