//! Semantic validation for parsed configuration values.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::config::types::ExtractorConfig;
use crate::query::Identity;

/// Validate a parsed configuration together with the run identity.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing every validation failure found.
pub fn validate_config(config: &ExtractorConfig, identity: &Identity) -> Result<()> {
    let mut errors = Vec::new();
    let params = &config.parameters;

    if let Err(e) = params.extraction_mode() {
        errors.push(e.message);
    }

    if let Err(e) = config.image_parameters.db.validate() {
        errors.push(e.message);
    }

    if config.image_parameters.snowsql.trim().is_empty() {
        errors.push("snowsql binary must not be empty".to_string());
    }

    if identity.tenant_id.trim().is_empty() {
        errors.push("Project id (KBC_PROJECTID) must not be empty".to_string());
    }
    if identity.stack_id.trim().is_empty() {
        errors.push("Stack id (KBC_STACKID) must not be empty".to_string());
    }

    if params.retry.max_attempts == 0 {
        errors.push("retry.max_attempts must be at least 1".to_string());
    }
    if params.retry.max_backoff_ms < params.retry.backoff_ms {
        errors.push(format!(
            "retry.max_backoff_ms ({}) must not be lower than retry.backoff_ms ({})",
            params.retry.max_backoff_ms, params.retry.backoff_ms
        ));
    }

    if params.export.max_file_size == 0 {
        errors.push("export.max_file_size must be > 0".to_string());
    }

    if let Some(tables) = &params.tables {
        let mut seen = HashSet::new();
        for (i, table) in tables.iter().enumerate() {
            if table.schema.trim().is_empty() || table.name.trim().is_empty() {
                errors.push(format!("Table {i} must have a non-empty schema and name"));
                continue;
            }
            if !seen.insert((table.schema.as_str(), table.name.as_str())) {
                errors.push(format!(
                    "Duplicate table '{}.{}' in tables",
                    table.schema, table.name
                ));
            }
        }
    }

    if !errors.is_empty() {
        bail!("Configuration validation failed:\n  - {}", errors.join("\n  - "));
    }
    Ok(())
}
