//! Runtime execution layer: the engine, its session state, and config.
//!
//! The split mirrors the rest of the crate: `graphs` is the immutable
//! script, `runtimes` is everything that moves while a call is running.

pub mod config;
pub mod engine;
pub mod session;

pub use config::EngineConfig;
pub use engine::{ConversationEngine, EngineError, SelectOutcome};
pub use session::ConversationSession;
