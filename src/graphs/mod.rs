//! Scenario graphs: storage, loading, and transition resolution.
//!
//! This module contains the read-only half of the system: everything
//! that turns stored JSON scenario documents into the validated,
//! shareable [`ScenarioGraph`] the engine walks.

pub mod loader;
pub mod model;
pub mod resolver;
pub mod store;


pub use loader::{GraphError, GraphLoader, ScenarioOverrides};
pub use model::{ModuleDescriptor, ScenarioGraph, StateMeta, StateNode};
pub use store::{ScenarioEntry, ScenarioStore};
