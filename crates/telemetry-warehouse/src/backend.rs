//! Capability traits the extraction engine consumes.
//!
//! [`Warehouse`] runs SQL; [`Transfer`] runs the external download tool.
//! Both are injected so the engine's retry and error handling can be
//! exercised without a network or subprocesses.

use telemetry_types::ExtractError;

use crate::row::Row;

/// SQL access to the warehouse.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    /// Run a statement, discarding any result.
    async fn execute(&self, sql: &str) -> Result<(), ExtractError>;

    /// Run a query and return every row.
    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>, ExtractError>;

    /// First column of the first row, `None` when there are no rows or the
    /// value is NULL.
    ///
    /// Extra rows are ignored. Callers that must reject an ambiguous result,
    /// such as the watermark lookup, use [`Warehouse::fetch_all`] and check
    /// the row count themselves.
    async fn fetch_one(&self, sql: &str) -> Result<Option<String>, ExtractError> {
        let rows = self.fetch_all(sql).await?;
        Ok(rows
            .first()
            .and_then(|row| row.value_at(0))
            .map(str::to_string))
    }
}

/// Captured result of one transfer-tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutput {
    /// Process exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl TransferOutput {
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// External tool downloading staged files to local disk.
#[allow(async_fn_in_trait)]
pub trait Transfer {
    /// Run the tool against a generated script. A non-zero exit is reported
    /// through [`TransferOutput`], not as an error; `Err` means the tool
    /// could not be run at all.
    async fn run(&self, script: &str) -> Result<TransferOutput, ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneRow;

    impl Warehouse for OneRow {
        async fn execute(&self, _sql: &str) -> Result<(), ExtractError> {
            Ok(())
        }

        async fn fetch_all(&self, _sql: &str) -> Result<Vec<Row>, ExtractError> {
            Ok(vec![Row::from_pairs([("value", "42"), ("other", "x")])])
        }
    }

    #[tokio::test]
    async fn fetch_one_takes_first_column_of_first_row() {
        assert_eq!(OneRow.fetch_one("SELECT 1").await.unwrap(), Some("42".to_string()));
    }

    #[tokio::test]
    async fn fetch_one_ignores_extra_rows_and_empty_results() {
        let warehouse = crate::MemoryWarehouse::new();
        warehouse.respond(
            "CURRENT_VERSION",
            vec![
                Row::from_pairs([("version", "8.40.1")]),
                Row::from_pairs([("version", "8.39.0")]),
            ],
        );
        assert_eq!(
            warehouse.fetch_one("SELECT CURRENT_VERSION()").await.unwrap(),
            Some("8.40.1".to_string())
        );
        assert_eq!(warehouse.fetch_one("SELECT 1").await.unwrap(), None);
    }

    #[test]
    fn transfer_output_success_requires_zero_exit() {
        assert!(TransferOutput::succeeded().success());
        assert!(!TransferOutput::failed(1, "boom").success());
        assert!(!TransferOutput::default().success());
    }
}
