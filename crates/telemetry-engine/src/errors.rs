//! Run-level error model.

use telemetry_types::ExtractError;

/// Error that aborts an extraction run.
///
/// `Extract` wraps a typed [`ExtractError`] from the warehouse, transfer
/// tool or contract checks. `Infrastructure` wraps opaque host-side
/// failures (state store, unexpected filesystem state) that never carry a
/// category.
#[derive(Debug)]
pub enum PipelineError {
    /// Typed extraction error.
    Extract(ExtractError),
    /// Infrastructure error (state store, runtime setup, etc.)
    Infrastructure(anyhow::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extract(e) => write!(f, "{e}"),
            Self::Infrastructure(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<anyhow::Error> for PipelineError {
    fn from(e: anyhow::Error) -> Self {
        Self::Infrastructure(e)
    }
}

impl From<ExtractError> for PipelineError {
    fn from(e: ExtractError) -> Self {
        Self::Extract(e)
    }
}

impl PipelineError {
    /// Returns the typed extraction error if this is an `Extract` variant.
    #[must_use]
    pub fn as_extract_error(&self) -> Option<&ExtractError> {
        match self {
            Self::Extract(e) => Some(e),
            Self::Infrastructure(_) => None,
        }
    }

    /// Process exit code: 1 for failures the operator can fix, 2 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Extract(e) if e.is_user_actionable() => 1,
            Self::Extract(_) | Self::Infrastructure(_) => 2,
        }
    }
}
