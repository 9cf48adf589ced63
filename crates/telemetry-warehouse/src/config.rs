//! Warehouse connection configuration.

use std::fmt;

use serde::{Deserialize, Deserializer};
use telemetry_types::ExtractError;

/// Connection parameters from the `image_parameters.db` config block.
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    pub user: String,
    #[serde(rename = "#password", alias = "password", default)]
    pub password: String,
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Value of the `X-Snowflake-Authorization-Token-Type` header sent
    /// alongside the password used as bearer token.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
}

fn default_port() -> u16 {
    443
}

fn default_token_type() -> String {
    "PROGRAMMATIC_ACCESS_TOKEN".to_string()
}

fn default_statement_timeout_secs() -> u64 {
    3600
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

/// Warehouse/database/schema a session runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseContext {
    pub warehouse: String,
    pub database: String,
    pub schema: String,
}

impl ConnectionConfig {
    #[must_use]
    pub fn context(&self) -> WarehouseContext {
        WarehouseContext {
            warehouse: self.warehouse.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
        }
    }

    /// Base URL of the account, e.g. `https://acme.eu-central-1.snowflakecomputing.com:443`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    /// Account locator: the host without its last two labels.
    #[must_use]
    pub fn account_name(&self) -> String {
        let labels: Vec<&str> = self.host.split('.').collect();
        let keep = labels.len().saturating_sub(2).max(1);
        labels[..keep].join(".")
    }

    /// Collect every missing required parameter into one error.
    ///
    /// # Errors
    ///
    /// Returns a `config` error listing the empty fields.
    pub fn validate(&self) -> Result<(), ExtractError> {
        let required = [
            ("host", &self.host),
            ("user", &self.user),
            ("#password", &self.password),
            ("database", &self.database),
            ("schema", &self.schema),
            ("warehouse", &self.warehouse),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExtractError::config(
                "MISSING_CONNECTION_PARAMETER",
                format!("missing connection parameter(s): {}", missing.join(", ")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ConnectionConfig {
        serde_json::from_str(json).expect("valid connection config")
    }

    const FULL: &str = r##"{
        "host": "acme.eu-central-1.snowflakecomputing.com",
        "port": "443",
        "user": "EXTRACTOR",
        "#password": "secret",
        "database": "TELEMETRY",
        "schema": "PUBLIC",
        "warehouse": "EXPORT_WH"
    }"##;

    #[test]
    fn parses_keboola_style_block() {
        let config = parse(FULL);
        assert_eq!(config.port, 443);
        assert_eq!(config.password, "secret");
        assert_eq!(config.token_type, "PROGRAMMATIC_ACCESS_TOKEN");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.context(),
            WarehouseContext {
                warehouse: "EXPORT_WH".into(),
                database: "TELEMETRY".into(),
                schema: "PUBLIC".into(),
            }
        );
    }

    #[test]
    fn account_name_drops_domain_suffix() {
        let config = parse(FULL);
        assert_eq!(config.account_name(), "acme.eu-central-1");
        assert_eq!(
            config.base_url(),
            "https://acme.eu-central-1.snowflakecomputing.com:443"
        );
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", parse(FULL));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn validate_lists_all_missing_fields() {
        let mut config = parse(FULL);
        config.user = String::new();
        config.warehouse = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("user"));
        assert!(err.message.contains("warehouse"));
        assert!(!err.message.contains("database"));
    }
}
