//! In-memory [`Warehouse`] and [`Transfer`] used by tests and dry runs.
//!
//! Responses are keyed by a substring of the SQL text. When several rules
//! match, the most recently registered one wins. Unmatched statements
//! succeed with no rows.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use telemetry_types::ExtractError;

use crate::backend::{Transfer, TransferOutput, Warehouse};
use crate::row::Row;

#[derive(Default)]
struct WarehouseState {
    rules: Vec<(String, Vec<Row>)>,
    failures: VecDeque<(String, ExtractError)>,
    executed: Vec<String>,
}

/// Scripted warehouse recording every statement it receives.
#[derive(Default)]
pub struct MemoryWarehouse {
    state: Mutex<WarehouseState>,
}

impl MemoryWarehouse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WarehouseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer statements containing `needle` with `rows`.
    pub fn respond(&self, needle: impl Into<String>, rows: Vec<Row>) -> &Self {
        self.lock().rules.push((needle.into(), rows));
        self
    }

    /// Fail the next statement containing `needle` once with `error`.
    pub fn fail_once(&self, needle: impl Into<String>, error: ExtractError) -> &Self {
        self.lock().failures.push_back((needle.into(), error));
        self
    }

    /// Every statement received, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Number of received statements containing `needle`.
    #[must_use]
    pub fn count_matching(&self, needle: &str) -> usize {
        self.lock()
            .executed
            .iter()
            .filter(|sql| sql.contains(needle))
            .count()
    }

    fn answer(&self, sql: &str) -> Result<Vec<Row>, ExtractError> {
        let mut state = self.lock();
        state.executed.push(sql.to_string());

        if let Some(pos) = state
            .failures
            .iter()
            .position(|(needle, _)| sql.contains(needle.as_str()))
        {
            if let Some((_, error)) = state.failures.remove(pos) {
                return Err(error);
            }
        }

        Ok(state
            .rules
            .iter()
            .rev()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

impl Warehouse for MemoryWarehouse {
    async fn execute(&self, sql: &str) -> Result<(), ExtractError> {
        self.answer(sql).map(|_| ())
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>, ExtractError> {
        self.answer(sql)
    }
}

#[derive(Default)]
struct TransferState {
    outputs: VecDeque<TransferOutput>,
    downloads: Vec<(String, Vec<(String, String)>)>,
    scripts: Vec<String>,
}

/// Scripted transfer tool.
///
/// Returns queued outputs in order, then succeeds. On success, files
/// registered with [`MemoryTransfer::on_get`] are written into the local
/// directory named by the script's `GET` line.
#[derive(Default)]
pub struct MemoryTransfer {
    state: Mutex<TransferState>,
}

impl MemoryTransfer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TransferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_output(&self, output: TransferOutput) -> &Self {
        self.lock().outputs.push_back(output);
        self
    }

    /// Write `files` (name, contents) when a script containing `needle` runs.
    pub fn on_get(&self, needle: impl Into<String>, files: Vec<(String, String)>) -> &Self {
        self.lock().downloads.push((needle.into(), files));
        self
    }

    #[must_use]
    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }
}

impl Transfer for MemoryTransfer {
    async fn run(&self, script: &str) -> Result<TransferOutput, ExtractError> {
        let (output, files) = {
            let mut state = self.lock();
            state.scripts.push(script.to_string());
            let output = state
                .outputs
                .pop_front()
                .unwrap_or_else(TransferOutput::succeeded);
            let files: Vec<(String, String)> = state
                .downloads
                .iter()
                .filter(|(needle, _)| script.contains(needle.as_str()))
                .flat_map(|(_, files)| files.iter().cloned())
                .collect();
            (output, files)
        };

        if output.success() && !files.is_empty() {
            let target = download_target(script).ok_or_else(|| {
                ExtractError::transfer("NO_GET_TARGET", "script has no GET target directory")
            })?;
            std::fs::create_dir_all(&target)?;
            for (name, contents) in files {
                std::fs::write(target.join(name), contents)?;
            }
        }
        Ok(output)
    }
}

/// Local directory of the first `GET '<stage>' 'file://<dir>/'` line, with
/// the literal's `''` and `\\` escapes undone.
fn download_target(script: &str) -> Option<PathBuf> {
    let line = script
        .lines()
        .find(|line| line.trim_start().starts_with("GET "))?;
    let rest = line.split_once("'file://")?.1;

    let mut dir = String::new();
    let mut chars = rest.chars().peekable();
    loop {
        match chars.next()? {
            '\\' => dir.push(chars.next()?),
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                dir.push('\'');
            }
            '\'' => break,
            c => dir.push(c),
        }
    }
    Some(PathBuf::from(dir.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latest_matching_rule_wins() {
        let warehouse = MemoryWarehouse::new();
        warehouse
            .respond("SHOW TABLES", vec![Row::from_pairs([("name", "old")])])
            .respond("SHOW TABLES", vec![Row::from_pairs([("name", "new")])]);

        let rows = warehouse.fetch_all("SHOW TABLES IN SCHEMA").await.unwrap();
        assert_eq!(rows[0].get("name"), Some("new"));
        assert!(warehouse.fetch_all("SELECT 1").await.unwrap().is_empty());
        assert_eq!(warehouse.count_matching("SHOW"), 1);
    }

    #[tokio::test]
    async fn failures_fire_once() {
        let warehouse = MemoryWarehouse::new();
        warehouse.fail_once("COPY", ExtractError::transient_db("TIMEOUT", "slow"));

        assert!(warehouse.execute("COPY INTO x").await.is_err());
        assert!(warehouse.execute("COPY INTO x").await.is_ok());
        assert_eq!(warehouse.executed().len(), 2);
    }

    #[tokio::test]
    async fn transfer_writes_files_into_get_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("events.csv");
        let script = format!(
            "USE WAREHOUSE \"WH\";\nGET '@~/stage/' 'file://{}/';\n",
            target.display()
        );

        let transfer = MemoryTransfer::new();
        transfer.on_get("@~/stage/", vec![("part_0_0_0.csv.gz".into(), "data".into())]);
        let output = transfer.run(&script).await.unwrap();

        assert!(output.success());
        assert_eq!(
            std::fs::read_to_string(target.join("part_0_0_0.csv.gz")).unwrap(),
            "data"
        );
        assert_eq!(transfer.scripts(), vec![script]);
    }

    #[tokio::test]
    async fn failed_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("GET '@~/s/' 'file://{}/out/';", dir.path().display());

        let transfer = MemoryTransfer::new();
        transfer
            .push_output(TransferOutput::failed(3, "network"))
            .on_get("@~/s/", vec![("f".into(), "x".into())]);

        let output = transfer.run(&script).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn parses_get_target() {
        assert_eq!(
            download_target("GET '@~/a/' 'file:///data/out/tables/t.csv/';"),
            Some(PathBuf::from("/data/out/tables/t.csv"))
        );
        assert_eq!(download_target("SELECT 1;"), None);
        assert_eq!(
            download_target("GET '@~/a/' 'file:///data/o''brien\\\\x/t.csv/';"),
            Some(PathBuf::from("/data/o'brien\\x/t.csv"))
        );
    }
}
