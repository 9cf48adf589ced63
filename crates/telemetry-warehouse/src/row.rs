//! Loosely-typed result rows as returned by the warehouse.

use telemetry_types::ExtractError;

/// One result row: column names paired with nullable text values.
///
/// Column lookup is case-insensitive because `SHOW` commands return
/// lowercase names while `information_schema` returns uppercase ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, Option<String>)>,
}

impl Row {
    #[must_use]
    pub fn new(fields: Vec<(String, Option<String>)>) -> Self {
        Self { fields }
    }

    /// Build a row with no NULL values.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }

    /// Append a NULL value for `column`.
    #[must_use]
    pub fn with_null(mut self, column: impl Into<String>) -> Self {
        self.fields.push((column.into(), None));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value of `column`; `None` when the column is absent or NULL.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Value at a positional index; `None` when out of range or NULL.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|(_, value)| value.as_deref())
    }

    /// Non-NULL value of `column`, or a data error naming it.
    ///
    /// # Errors
    ///
    /// Returns a `data` error when the column is absent or NULL.
    pub fn require(&self, column: &str) -> Result<&str, ExtractError> {
        self.get(column).ok_or_else(|| {
            ExtractError::data(
                "MISSING_FIELD",
                format!("result row has no value for column '{column}'"),
            )
        })
    }

    /// Integer value of `column`; NULL or absent reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns a `data` error when the value is not an integer.
    pub fn get_i64(&self, column: &str) -> Result<Option<i64>, ExtractError> {
        self.get(column)
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|e| {
                    ExtractError::data(
                        "INVALID_INTEGER",
                        format!("column '{column}' value '{raw}' is not an integer: {e}"),
                    )
                })
            })
            .transpose()
    }
}
