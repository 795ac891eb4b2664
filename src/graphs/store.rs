//! Scenario graph store: raw scenario documents plus lifecycle status.
//!
//! Pure data, populated once at startup. The store never interprets its
//! documents; materialization happens in the
//! [`GraphLoader`](super::loader::GraphLoader).

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::types::ScenarioStatus;

/// One stored scenario: the raw JSON document and its status.
#[derive(Clone, Debug)]
pub struct ScenarioEntry {
    pub document: Value,
    pub status: ScenarioStatus,
}

/// The set of scenarios known to this process, keyed by scenario id.
#[derive(Debug, Default)]
pub struct ScenarioStore {
    entries: FxHashMap<String, ScenarioEntry>,
}

impl ScenarioStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scenario document with production status.
    pub fn insert(&mut self, id: impl Into<String>, document: Value) {
        self.insert_with_status(id, document, ScenarioStatus::Production);
    }

    /// Insert a scenario document with an explicit lifecycle status.
    pub fn insert_with_status(
        &mut self,
        id: impl Into<String>,
        document: Value,
        status: ScenarioStatus,
    ) {
        self.entries
            .insert(id.into(), ScenarioEntry { document, status });
    }

    /// Parse and insert a scenario from its JSON source text.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error if `json` is not valid JSON.
    pub fn insert_json(
        &mut self,
        id: impl Into<String>,
        json: &str,
    ) -> Result<(), serde_json::Error> {
        let document: Value = serde_json::from_str(json)?;
        self.insert(id, document);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ScenarioEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids of all stored scenarios, in arbitrary order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
