//! Extraction run result types.

use telemetry_types::IncrementalState;

/// Per-table outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    /// `schema.name`
    pub table: String,
    pub rows: u64,
    /// Watermark recorded for the next run, if the table is fetched
    /// incrementally and has one.
    pub watermark: Option<String>,
}

/// Result of an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    /// Incremental state produced by this run.
    pub state: IncrementalState,
    pub tables: Vec<TableReport>,
    pub manifests_written: usize,
    pub duration_secs: f64,
}

impl ExtractOutcome {
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// Tables that produced output files.
    #[must_use]
    pub fn exported_tables(&self) -> usize {
        self.tables.iter().filter(|t| t.rows > 0).count()
    }
}
