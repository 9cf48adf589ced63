//! Stage-and-download bulk export.
//!
//! A table is unloaded server-side into gzip CSV parts under a per-user
//! stage, downloaded with the transfer tool into
//! `out/tables/<table>.csv/`, and the stage is removed afterwards.

use std::path::{Path, PathBuf};

use telemetry_types::{ExtractError, Table};
use telemetry_warehouse::{quote_identifier, quote_literal, Transfer, Warehouse, WarehouseContext};

use crate::query::Identity;

const STAGE_ROOT: &str = "telemetry_export";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50_000_000;

/// Location of a table's unloaded files in the user stage, relative to `@~/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePath(String);

impl StagePath {
    /// Stage unique per table, tenant and stack. ASCII alphanumerics are
    /// kept and every other byte, `_` included, becomes `_xx` (lowercase
    /// hex). An encoded part never contains `__` or ends with `_`, so the
    /// `__` separators are unambiguous.
    #[must_use]
    pub fn for_table(table: &Table, identity: &Identity) -> Self {
        let parts = [
            table.name(),
            identity.tenant_id.as_str(),
            identity.stack_id.as_str(),
        ];
        let encoded: Vec<String> = parts.iter().map(|part| encode_stage_part(part)).collect();
        Self(format!("{STAGE_ROOT}/{}", encoded.join("__")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `@~/<stage>/`
    #[must_use]
    pub fn location(&self) -> String {
        format!("@~/{}/", self.0)
    }
}

fn encode_stage_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02x}"));
        }
    }
    out
}

/// Unload `select_sql` into `stage` as gzip CSV parts.
#[must_use]
pub fn copy_statement(stage: &StagePath, select_sql: &str, max_file_size: u64) -> String {
    format!(
        "COPY INTO @~/{}/part FROM ({select_sql}) \
         FILE_FORMAT = (TYPE = CSV FIELD_DELIMITER = ',' FIELD_OPTIONALLY_ENCLOSED_BY = '\"' \
         ESCAPE_UNENCLOSED_FIELD = '\\\\' COMPRESSION = 'GZIP' NULL_IF = ()) \
         HEADER = FALSE MAX_FILE_SIZE = {max_file_size} OVERWRITE = TRUE",
        stage.as_str()
    )
}

#[must_use]
pub fn remove_statement(stage: &StagePath) -> String {
    format!("REMOVE {}", stage.location())
}

/// Transfer-tool script downloading `stage` into `local_dir`, which must be
/// absolute.
#[must_use]
pub fn download_script(context: &WarehouseContext, stage: &StagePath, local_dir: &Path) -> String {
    [
        format!("USE WAREHOUSE {};", quote_identifier(&context.warehouse)),
        format!("USE DATABASE {};", quote_identifier(&context.database)),
        format!(
            "USE SCHEMA {}.{};",
            quote_identifier(&context.database),
            quote_identifier(&context.schema)
        ),
        format!(
            "GET {} {};",
            quote_literal(&stage.location()),
            quote_literal(&format!("file://{}/", local_dir.display()))
        ),
    ]
    .join("\n")
}

/// `<tables_dir>/<table>.csv`
#[must_use]
pub fn table_output_path(tables_dir: &Path, table_name: &str) -> PathBuf {
    tables_dir.join(format!("{table_name}.csv"))
}

/// Remove a previous output artifact, file or directory. Returns whether
/// anything was removed.
///
/// # Errors
///
/// Returns the underlying I/O error for anything but a missing path.
pub async fn remove_table_output(path: &Path) -> std::io::Result<bool> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }
    Ok(true)
}

/// Runs the unload / download / cleanup sequence for one table.
pub struct BulkExport<'a, W, T> {
    warehouse: &'a W,
    transfer: &'a T,
    context: WarehouseContext,
    tables_dir: PathBuf,
    max_file_size: u64,
}

impl<'a, W: Warehouse, T: Transfer> BulkExport<'a, W, T> {
    #[must_use]
    pub fn new(
        warehouse: &'a W,
        transfer: &'a T,
        context: WarehouseContext,
        tables_dir: PathBuf,
        max_file_size: u64,
    ) -> Self {
        Self {
            warehouse,
            transfer,
            context,
            tables_dir,
            max_file_size,
        }
    }

    #[must_use]
    pub fn tables_dir(&self) -> &Path {
        &self.tables_dir
    }

    /// Export `select_sql` for `table` and return the unloaded row count.
    ///
    /// Zero rows short-circuit: nothing is created locally and no download
    /// runs.
    ///
    /// # Errors
    ///
    /// Warehouse errors propagate unchanged. A failed download is a
    /// `transfer` error with code `DOWNLOAD_FAILED`.
    pub async fn export_and_download(
        &self,
        table: &Table,
        stage: &StagePath,
        select_sql: &str,
    ) -> Result<u64, ExtractError> {
        let rows = self
            .warehouse
            .fetch_all(&copy_statement(stage, select_sql, self.max_file_size))
            .await?;
        let mut unloaded = 0u64;
        for row in &rows {
            let count = row.get_i64("rows_unloaded")?.unwrap_or(0);
            unloaded += u64::try_from(count).map_err(|_| {
                ExtractError::data(
                    "INVALID_ROW_COUNT",
                    format!("negative rows_unloaded {count} for table '{}'", table.name()),
                )
            })?;
        }

        if unloaded == 0 {
            tracing::info!(table = table.name(), "No rows unloaded");
            return Ok(0);
        }
        tracing::info!(table = table.name(), rows = unloaded, stage = stage.as_str(), "Rows unloaded to stage");

        let target = table_output_path(&self.tables_dir, table.name());
        remove_table_output(&target).await?;
        tokio::fs::create_dir_all(&target).await?;
        let target = tokio::fs::canonicalize(&target).await?;

        let output = self
            .transfer
            .run(&download_script(&self.context, stage, &target))
            .await?;
        if !output.success() {
            tracing::error!(
                table = table.name(),
                exit_code = ?output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "Download of staged files failed"
            );
            if let Err(e) = self.warehouse.execute(&remove_statement(stage)).await {
                tracing::warn!(stage = stage.as_str(), error = %e, "Stage cleanup after failed download failed");
            }
            let exit = output
                .exit_code
                .map_or_else(|| "signal".to_string(), |code| code.to_string());
            return Err(ExtractError::transfer(
                "DOWNLOAD_FAILED",
                format!(
                    "download of table '{}' failed (exit {exit}): {}",
                    table.name(),
                    output.stderr.trim()
                ),
            )
            .with_details(serde_json::json!({
                "exit_code": output.exit_code,
                "stdout": output.stdout,
                "stderr": output.stderr,
            })));
        }

        self.warehouse.execute(&remove_statement(stage)).await?;
        tracing::info!(table = table.name(), path = %target.display(), "Downloaded");
        Ok(unloaded)
    }
}
