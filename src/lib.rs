//! # Scriptline: Declarative Scripted-Conversation Engine
//!
//! Scriptline drives guided call-center conversations from declarative
//! scenario graphs: JSON documents describing states, transitions, and the
//! transcript side effects of entering each state.
//!
//! ## Core Concepts
//!
//! - **Scenario graphs**: Immutable state machines loaded and validated from JSON
//! - **Messages**: Append-only transcript entries with sender typing
//! - **Engine**: Session runtime applying selections and side effects
//! - **Modules**: Interactive widgets with a trigger/complete lifecycle
//! - **Event bridge**: Typed broadcast signals closing the module loop
//! - **Scanner**: Regex detection of regulated data in customer text
//!
//! ## Quick Start
//!
//! ### Working with Messages
//!
//! Transcript entries use convenience constructors per sender:
//!
//! ```
//! use scriptline::message::Message;
//! use scriptline::types::Sender;
//!
//! let customer = Message::customer("I'd like to cancel my contract");
//! let agent = Message::agent("Of course, let me pull that up.");
//! let system = Message::system("Verification required");
//!
//! assert!(customer.has_sender(Sender::Customer));
//! assert!(!customer.has_sender(Sender::Agent));
//! ```
//!
//! ### Loading a scenario and running a call
//!
//! ```
//! use std::sync::Arc;
//! use scriptline::event_bus::EventHub;
//! use scriptline::graphs::{GraphLoader, ScenarioStore};
//! use scriptline::runtimes::{ConversationEngine, EngineConfig};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = ScenarioStore::new();
//! store.insert("greeting", json!({
//!     "initial": "start",
//!     "states": {
//!         "start": {
//!             "meta": { "customerText": "Hello?" },
//!             "on": { "Hi, how can I help?": "done" }
//!         },
//!         "done": { "meta": { "systemMessage": "Call finished" } }
//!     }
//! }));
//!
//! let graph = GraphLoader::new().load(&store, "greeting")?;
//! let hub = EventHub::with_default_capacity();
//! let engine = ConversationEngine::new(graph, hub, EngineConfig::default())?;
//!
//! engine.start()?;
//! assert_eq!(engine.current_state_id().as_deref(), Some("start"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Error Handling
//!
//! All fallible operations return typed errors carrying diagnostic codes:
//!
//! ```
//! use scriptline::graphs::{GraphError, GraphLoader, ScenarioStore};
//!
//! let store = ScenarioStore::new();
//! let mut loader = GraphLoader::new();
//! assert!(matches!(
//!     loader.load(&store, "missing"),
//!     Err(GraphError::NotFound { .. })
//! ));
//! ```
//!
//! ## Module Guide
//!
//! - [`types`] - Core identifiers: tokens, senders, phases, module kinds
//! - [`message`] - Transcript entries and construction utilities
//! - [`graphs`] - Scenario storage, loading, and transition resolution
//! - [`scanner`] - Sensitive-data detection over customer text
//! - [`modules`] - Module lifecycle tracking
//! - [`event_bus`] - Typed bridge signals, broadcast hub, and sinks
//! - [`notify`] - Fire-and-forget notification surface
//! - [`runtimes`] - The conversation engine, session state, and config
//! - [`telemetry`] - Tracing setup and event formatting

pub mod event_bus;
pub mod graphs;
pub mod message;
pub mod modules;
pub mod notify;
pub mod runtimes;
pub mod scanner;
pub mod telemetry;
pub mod types;
