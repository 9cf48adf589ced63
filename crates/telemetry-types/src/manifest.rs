//! Table manifest descriptors accompanying exported data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Table;
use crate::datatype::translate;

/// A `{key, value}` metadata pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Structural descriptor written next to an exported table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    /// Output name the descriptor belongs to (`<table>.csv`).
    #[serde(skip)]
    pub destination: String,
    pub incremental: bool,
    pub primary_key: Vec<String>,
    pub columns: Vec<String>,
    pub delimiter: String,
    pub enclosure: String,
    pub metadata: Vec<MetadataEntry>,
    pub column_metadata: BTreeMap<String, Vec<MetadataEntry>>,
}

impl TableManifest {
    /// Build the manifest of a finalized table.
    #[must_use]
    pub fn for_table(table: &Table, incremental: bool) -> Self {
        let column_metadata = table
            .columns()
            .iter()
            .map(|column| (column.name.clone(), translate(column).to_metadata()))
            .collect();

        Self {
            destination: format!("{}.csv", table.name()),
            incremental,
            primary_key: table.primary_key(),
            columns: table.columns().iter().map(|c| c.name.clone()).collect(),
            delimiter: ",".to_string(),
            enclosure: "\"".to_string(),
            metadata: vec![MetadataEntry::new("KBC.name", table.name())],
            column_metadata,
        }
    }
}
