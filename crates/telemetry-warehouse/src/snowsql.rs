//! [`Transfer`] implementation running the `snowsql` command-line client.

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use telemetry_types::ExtractError;
use tokio::process::Command;

use crate::backend::{Transfer, TransferOutput};
use crate::config::ConnectionConfig;

/// Connection name the generated config file defines.
pub const CONNECTION_NAME: &str = "downloader";

/// Render the snowsql config file for `config`.
#[must_use]
pub fn render_config(config: &ConnectionConfig) -> String {
    let entries = [
        ("accountname", config.account_name()),
        ("username", config.user.clone()),
        ("password", config.password.clone()),
        ("dbname", config.database.clone()),
        ("warehousename", config.warehouse.clone()),
        ("schemaname", config.schema.clone()),
    ];

    let mut lines = vec![
        String::new(),
        "[options]".to_string(),
        "exit_on_error = true".to_string(),
        String::new(),
        format!("[connections.{CONNECTION_NAME}]"),
    ];
    lines.extend(
        entries
            .iter()
            .map(|(key, value)| format!("{key} = \"{}\"", escape_value(value))),
    );
    lines.join("\n")
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Runs `snowsql -c downloader -f <script>` against a private config file.
///
/// The config file holds the password and lives as long as the transfer.
pub struct SnowSqlTransfer {
    binary: PathBuf,
    config_file: NamedTempFile,
}

impl SnowSqlTransfer {
    /// Write the config file and prepare the transfer.
    ///
    /// # Errors
    ///
    /// Returns an `io` error when the config file cannot be written.
    pub fn new(binary: impl Into<PathBuf>, config: &ConnectionConfig) -> Result<Self, ExtractError> {
        let mut config_file = tempfile::Builder::new()
            .prefix("snowsql")
            .suffix(".config")
            .tempfile()?;
        config_file.write_all(render_config(config).as_bytes())?;
        config_file.flush()?;
        Ok(Self {
            binary: binary.into(),
            config_file,
        })
    }
}

impl Transfer for SnowSqlTransfer {
    async fn run(&self, script: &str) -> Result<TransferOutput, ExtractError> {
        let mut script_file = tempfile::Builder::new()
            .prefix("snowsql")
            .suffix(".sql")
            .tempfile()?;
        script_file.write_all(script.as_bytes())?;
        script_file.flush()?;

        tracing::debug!(binary = %self.binary.display(), "Running transfer tool");
        let output = Command::new(&self.binary)
            .arg("--noup")
            .arg("--config")
            .arg(self.config_file.path())
            .arg("-c")
            .arg(CONNECTION_NAME)
            .arg("-f")
            .arg(script_file.path())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExtractError::transfer(
                    "TRANSFER_SPAWN_FAILED",
                    format!("cannot run {}: {e}", self.binary.display()),
                )
            })?;

        Ok(TransferOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> ConnectionConfig {
        serde_json::from_value(serde_json::json!({
            "host": "acme.eu-central-1.snowflakecomputing.com",
            "user": "EXTRACTOR",
            "#password": "pa\"ss",
            "database": "TELEMETRY",
            "schema": "PUBLIC",
            "warehouse": "EXPORT_WH"
        }))
        .unwrap()
    }

    #[test]
    fn config_defines_downloader_connection() {
        let rendered = render_config(&connection());
        let expected = [
            "",
            "[options]",
            "exit_on_error = true",
            "",
            "[connections.downloader]",
            "accountname = \"acme.eu-central-1\"",
            "username = \"EXTRACTOR\"",
            "password = \"pa\\\"ss\"",
            "dbname = \"TELEMETRY\"",
            "warehousename = \"EXPORT_WH\"",
            "schemaname = \"PUBLIC\"",
        ]
        .join("\n");
        assert_eq!(rendered, expected);
    }

    #[test]
    fn config_file_is_written_on_construction() {
        let transfer = SnowSqlTransfer::new("snowsql", &connection()).unwrap();
        let written = std::fs::read_to_string(transfer.config_file.path()).unwrap();
        assert!(written.contains("[connections.downloader]"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_binary_is_transfer_error() {
        let transfer =
            SnowSqlTransfer::new("/nonexistent/snowsql-binary", &connection()).unwrap();
        let err = transfer.run("SELECT 1;").await.unwrap_err();
        assert_eq!(err.code, "TRANSFER_SPAWN_FAILED");
    }
}
