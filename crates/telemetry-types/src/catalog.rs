//! Structural model of warehouse tables and columns.

use serde::{Deserialize, Serialize};

use crate::contract::RequiredColumns;

/// Types that report no length metadata.
const TYPES_WITHOUT_LENGTH: [&str; 3] = ["TEXT", "MEDIUMTEXT", "LONGTEXT"];

/// A (schema, name) pair naming one table, used for whitelists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Stable `schema.name` identifier.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Length metadata of a column, absent for unbounded text types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLength {
    pub character_maximum: i64,
    pub numeric_precision: i64,
    pub numeric_scale: i64,
}

/// One column of a warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub character_maximum_length: i64,
    pub numeric_precision: i64,
    pub numeric_scale: i64,
    pub is_nullable: bool,
    pub data_type: String,
    pub table_schema: String,
    pub table_name: String,
    #[serde(default)]
    pub is_primary_key: bool,
}

impl Column {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: bool,
        table_schema: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            character_maximum_length: 0,
            numeric_precision: 0,
            numeric_scale: 0,
            is_nullable,
            data_type: data_type.into(),
            table_schema: table_schema.into(),
            table_name: table_name.into(),
            is_primary_key: false,
        }
    }

    #[must_use]
    pub fn with_lengths(mut self, character_maximum: i64, precision: i64, scale: i64) -> Self {
        self.character_maximum_length = character_maximum;
        self.numeric_precision = precision;
        self.numeric_scale = scale;
        self
    }

    /// Length metadata, `None` for TEXT-like types.
    #[must_use]
    pub fn length(&self) -> Option<ColumnLength> {
        let upper = self.data_type.to_ascii_uppercase();
        if TYPES_WITHOUT_LENGTH.contains(&upper.as_str()) {
            return None;
        }
        Some(ColumnLength {
            character_maximum: self.character_maximum_length,
            numeric_precision: self.numeric_precision,
            numeric_scale: self.numeric_scale,
        })
    }

    /// `schema.name` of the owning table.
    #[must_use]
    pub fn table_id(&self) -> String {
        format!("{}.{}", self.table_schema, self.table_name)
    }
}

/// A warehouse table with its columns in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    schema: String,
    name: String,
    columns: Vec<Column>,
}

impl Table {
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable `schema.name` identifier.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    #[must_use]
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.schema, &self.name)
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Append a column. No re-sorting happens later, so callers supply
    /// columns in ordinal order.
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Names of primary-key columns in column order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Contract columns this table lacks, in contract order.
    #[must_use]
    pub fn missing_required_columns(&self, required: &RequiredColumns) -> Vec<String> {
        required.missing_from(self.columns.iter().map(|c| c.name.as_str()))
    }
}
