//! Extraction orchestration for the telemetry extractor.
//!
//! Discovers exportable tables, unloads each one through a warehouse stage,
//! downloads the staged files, writes manifests and computes the
//! incremental state for the next run.

pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod export;
pub mod manifest;
pub mod orchestrator;
pub mod query;
pub mod result;
pub mod retry;

// Re-export public API for convenience
pub use catalog::{Catalog, CatalogBuilder};
pub use errors::PipelineError;
pub use orchestrator::{ExtractSettings, Extractor};
pub use query::Identity;
pub use result::{ExtractOutcome, TableReport};
pub use retry::RetryPolicy;
