//! Configuration parsing with environment variable substitution.
//!
//! The document is JSON in practice; it is parsed as YAML, which accepts
//! JSON as well.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::ExtractorConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error if any referenced environment variable is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", errors.join(", "));
    }

    Ok(result)
}

/// Parse a configuration document (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the document is invalid.
pub fn parse_config_str(input: &str) -> Result<ExtractorConfig> {
    let substituted = substitute_env_vars(input)?;
    let config: ExtractorConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse configuration")?;
    Ok(config)
}

/// Parse a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the document is invalid.
pub fn parse_config(path: &Path) -> Result<ExtractorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_types::{ContractScope, ErrorCategory};

    const MINIMAL: &str = r##"{
        "parameters": {},
        "image_parameters": {
            "db": {
                "host": "acme.eu-central-1.snowflakecomputing.com",
                "port": 443,
                "user": "EXTRACTOR",
                "#password": "secret",
                "database": "TELEMETRY",
                "schema": "PUBLIC",
                "warehouse": "EXPORT_WH"
            }
        }
    }"##;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TE_TEST_HOST", "acme.snowflakecomputing.com");
        let input = "host: ${TE_TEST_HOST}\nport: 443";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("acme.snowflakecomputing.com"));
        assert!(!result.contains("${TE_TEST_HOST}"));
        std::env::remove_var("TE_TEST_HOST");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = r#"{"parameters": {"mode": "project"}}"#;
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_multiple_missing_env_vars_all_reported() {
        let input = "${TE_MISSING_X} and ${TE_MISSING_Y}";
        let err_msg = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err_msg.contains("TE_MISSING_X"));
        assert!(err_msg.contains("TE_MISSING_Y"));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config_str(MINIMAL).unwrap();
        let params = &config.parameters;
        assert_eq!(params.mode, "project");
        assert!(!params.incremental_fetching);
        assert!(!params.incremental);
        assert_eq!(params.contract, ContractScope::AllModes);
        assert!(params.tables.is_none());
        assert_eq!(params.retry.max_attempts, 5);
        assert_eq!(params.retry.backoff_ms, 1_000);
        assert!(params.retry.retry_on.contains(&ErrorCategory::Transfer));
        assert_eq!(params.export.max_file_size, 50_000_000);
        assert_eq!(config.image_parameters.snowsql, "snowsql");
        assert_eq!(config.image_parameters.db.password, "secret");
    }

    #[test]
    fn test_full_parameters() {
        let input = MINIMAL.replace(
            r#""parameters": {}"#,
            r#""parameters": {
                "mode": "activity_center",
                "incrementalFetching": true,
                "incremental": true,
                "contract": "active_mode",
                "tables": [
                    {"schema": "PUBLIC", "name": "audit"},
                    {"schema": "PUBLIC", "name": "events", "incrementalFetching": false}
                ],
                "retry": {"max_attempts": 3, "backoff_ms": 10, "retry_on": ["transient_db"]},
                "export": {"max_file_size": 1000}
            }"#,
        );
        let config = parse_config_str(&input).unwrap();
        let params = &config.parameters;
        assert_eq!(params.mode, "activity_center");
        assert_eq!(params.contract, ContractScope::ActiveMode);
        let tables = params.tables.as_ref().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].incremental_fetching, None);
        assert_eq!(tables[1].incremental_fetching, Some(false));

        let policy = params.retry.to_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.retry_on, vec![ErrorCategory::TransientDb]);
        assert_eq!(params.export.max_file_size, 1000);
    }

    #[test]
    fn test_unknown_mode_is_kept_for_validation() {
        let input = MINIMAL.replace(r#""parameters": {}"#, r#""parameters": {"mode": "galaxy"}"#);
        let config = parse_config_str(&input).unwrap();
        let err = config.parameters.extraction_mode().unwrap_err();
        assert_eq!(err.code, "UNKNOWN_MODE");
    }

    #[test]
    fn test_missing_db_block_errors() {
        let result = parse_config_str(r#"{"parameters": {}, "image_parameters": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, MINIMAL).unwrap();
        assert!(parse_config(&path).is_ok());

        let err = parse_config(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
