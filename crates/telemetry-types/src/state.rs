//! Incremental state carried between runs.
//!
//! The state is owned by the caller: it is read before a run, passed into
//! the extractor, and the returned value is persisted afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Watermark of one incrementally fetched table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    #[serde(rename = "lastFetchedValue")]
    pub last_fetched_value: String,
}

/// Mapping from table name to its watermark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncrementalState(BTreeMap<String, TableState>);

impl IncrementalState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Watermark recorded for `table`, if any.
    #[must_use]
    pub fn last_fetched_value(&self, table: &str) -> Option<&str> {
        self.0.get(table).map(|s| s.last_fetched_value.as_str())
    }

    pub fn set_last_fetched_value(&mut self, table: impl Into<String>, value: impl Into<String>) {
        self.0.insert(
            table.into(),
            TableState {
                last_fetched_value: value.into(),
            },
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableState)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
