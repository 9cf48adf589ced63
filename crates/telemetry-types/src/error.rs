//! Structured error model for extraction operations.
//!
//! [`ExtractError`] carries a classification, a stable code, and optional
//! diagnostic details. Construct via category-specific factory methods.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of an extraction error.
///
/// Retry policies decide on the category alone, so every failure the
/// warehouse driver or transfer tool produces must land in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid or missing configuration.
    Config,
    /// Authentication or authorization failure.
    Auth,
    /// Transient network error.
    TransientNetwork,
    /// Transient warehouse error (throttling, service unavailable).
    TransientDb,
    /// Statement rejected by the warehouse (compilation, object missing).
    Sql,
    /// External transfer tool failed or could not be spawned.
    Transfer,
    /// Local filesystem failure.
    Io,
    /// Unexpected shape of data returned by the warehouse.
    Data,
    /// Operator-facing failure wrapping an exhausted export path.
    User,
    /// Broken internal invariant.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Auth => "auth",
            Self::TransientNetwork => "transient_network",
            Self::TransientDb => "transient_db",
            Self::Sql => "sql",
            Self::Transfer => "transfer",
            Self::Io => "io",
            Self::Data => "data",
            Self::User => "user",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Structured error from an extraction operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}")]
pub struct ExtractError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ExtractError {
    fn new(category: ErrorCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Configuration error.
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Config, code, message)
    }

    /// Authentication error.
    #[must_use]
    pub fn auth(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Auth, code, message)
    }

    /// Transient network error.
    #[must_use]
    pub fn transient_network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientNetwork, code, message)
    }

    /// Transient warehouse error.
    #[must_use]
    pub fn transient_db(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientDb, code, message)
    }

    /// Statement rejected by the warehouse.
    #[must_use]
    pub fn sql(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Sql, code, message)
    }

    /// Transfer tool failure.
    #[must_use]
    pub fn transfer(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Transfer, code, message)
    }

    /// Local filesystem failure.
    #[must_use]
    pub fn io(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Io, code, message)
    }

    /// Unexpected result shape.
    #[must_use]
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Data, code, message)
    }

    /// Internal invariant violation.
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, code, message)
    }

    /// Wrap `cause` as an operator-facing failure.
    ///
    /// The original category and code are kept in `details` so logs still
    /// show what went wrong underneath.
    #[must_use]
    pub fn user(code: impl Into<String>, message: impl Into<String>, cause: &ExtractError) -> Self {
        Self::new(ErrorCategory::User, code, message).with_details(serde_json::json!({
            "cause_category": cause.category,
            "cause_code": cause.code,
        }))
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether the error is something the operator can act on, as opposed
    /// to a defect in the extractor itself.
    #[must_use]
    pub fn is_user_actionable(&self) -> bool {
        self.category != ErrorCategory::Internal
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        Self::io("IO_ERROR", e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = ExtractError::config("UNKNOWN_MODE", "mode 'galaxy' is not supported");
        assert_eq!(
            err.to_string(),
            "[config] UNKNOWN_MODE: mode 'galaxy' is not supported"
        );
    }

    #[test]
    fn user_failure_keeps_cause_in_details() {
        let cause = ExtractError::transient_db("SERVICE_UNAVAILABLE", "503");
        let err = ExtractError::user("EXPORT_FAILED", "DB query failed: 503", &cause);
        assert_eq!(err.category, ErrorCategory::User);
        let details = err.details.expect("details attached");
        assert_eq!(details["cause_category"], "transient_db");
        assert_eq!(details["cause_code"], "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn only_internal_errors_are_not_user_actionable() {
        assert!(ExtractError::config("X", "y").is_user_actionable());
        assert!(ExtractError::transfer("X", "y").is_user_actionable());
        assert!(!ExtractError::internal("X", "y").is_user_actionable());
    }

    #[test]
    fn io_errors_convert_to_io_category() {
        let err: ExtractError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.category, ErrorCategory::Io);
        assert!(err.message.contains("gone"));
    }

    #[test]
    fn serde_roundtrip() {
        let err = ExtractError::transfer("DOWNLOAD_FAILED", "exit status 1")
            .with_details(serde_json::json!({"stderr": "network unreachable"}));
        let json = serde_json::to_string(&err).unwrap();
        let back: ExtractError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
