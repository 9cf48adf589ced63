//! Configuration file model.

use std::time::Duration;

use serde::Deserialize;
use telemetry_types::{ContractScope, ErrorCategory, ExtractError, ExtractionMode, TableRef};
use telemetry_warehouse::ConnectionConfig;

use crate::export::DEFAULT_MAX_FILE_SIZE;
use crate::retry::{
    RetryPolicy, DEFAULT_BASE_INTERVAL, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_INTERVAL,
    DEFAULT_RETRY_ON,
};

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    pub parameters: Parameters,
    pub image_parameters: ImageParameters,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    /// Raw mode string; see [`Parameters::extraction_mode`].
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(rename = "incrementalFetching", default)]
    pub incremental_fetching: bool,
    #[serde(default)]
    pub incremental: bool,
    #[serde(default)]
    pub contract: ContractScope,
    /// Whitelist. Absent means every table of the schema.
    #[serde(default)]
    pub tables: Option<Vec<TableSelection>>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_mode() -> String {
    ExtractionMode::default().as_str().to_string()
}

impl Parameters {
    /// # Errors
    ///
    /// Returns a `config` error (`UNKNOWN_MODE`) for an unrecognized mode.
    pub fn extraction_mode(&self) -> Result<ExtractionMode, ExtractError> {
        self.mode.parse()
    }
}

/// One whitelist entry, optionally overriding the global load flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSelection {
    pub schema: String,
    pub name: String,
    #[serde(rename = "incrementalFetching", default)]
    pub incremental_fetching: Option<bool>,
    #[serde(default)]
    pub incremental: Option<bool>,
}

impl TableSelection {
    #[must_use]
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.schema, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_retry_on")]
    pub retry_on: Vec<ErrorCategory>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    u64::try_from(DEFAULT_BASE_INTERVAL.as_millis()).unwrap_or(1_000)
}

fn default_max_backoff_ms() -> u64 {
    u64::try_from(DEFAULT_MAX_INTERVAL.as_millis()).unwrap_or(60_000)
}

fn default_retry_on() -> Vec<ErrorCategory> {
    DEFAULT_RETRY_ON.to_vec()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            retry_on: default_retry_on(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_interval: Duration::from_millis(self.backoff_ms),
            max_interval: Duration::from_millis(self.max_backoff_ms),
            retry_on: self.retry_on.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageParameters {
    pub db: ConnectionConfig,
    /// Transfer tool binary.
    #[serde(default = "default_snowsql")]
    pub snowsql: String,
}

fn default_snowsql() -> String {
    "snowsql".to_string()
}
