pub mod discover;
pub mod run;

use std::path::PathBuf;

use clap::Args;
use telemetry_engine::config::parser;
use telemetry_engine::config::types::ExtractorConfig;
use telemetry_engine::config::validator;
use telemetry_engine::{ExtractSettings, Identity, PipelineError};
use telemetry_types::ExtractError;

/// Where the run reads its inputs and who it extracts for.
#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// Component data directory (holds config.json, in/ and out/)
    #[arg(long, env = "KBC_DATADIR", default_value = "/data")]
    pub data_dir: PathBuf,

    /// Configuration file (default: `<data-dir>/config.json`)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tenant (project) id rows are scoped to
    #[arg(long, env = "KBC_PROJECTID", default_value = "")]
    pub project_id: String,

    /// Stack id rows are scoped to
    #[arg(long, env = "KBC_STACKID", default_value = "")]
    pub stack_id: String,
}

impl ContextArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.data_dir.join("config.json"))
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.project_id.trim(), self.stack_id.trim())
    }
}

/// Parsed and validated inputs shared by every command.
pub struct Loaded {
    pub config: ExtractorConfig,
    pub settings: ExtractSettings,
}

/// Parse, validate and resolve the configuration. Every failure here is a
/// configuration error.
pub fn load(args: &ContextArgs) -> Result<Loaded, PipelineError> {
    let path = args.config_path();
    let identity = args.identity();

    let config = parser::parse_config(&path).map_err(invalid_config)?;
    validator::validate_config(&config, &identity).map_err(invalid_config)?;
    let settings = ExtractSettings::from_config(&config, identity, &args.data_dir)?;

    tracing::info!(
        config = %path.display(),
        mode = %settings.mode,
        incremental_fetching = settings.incremental_fetching,
        whitelist = settings.tables.as_ref().map(Vec::len),
        "Configuration validated"
    );
    Ok(Loaded { config, settings })
}

fn invalid_config(e: anyhow::Error) -> PipelineError {
    PipelineError::Extract(ExtractError::config("INVALID_CONFIGURATION", format!("{e:#}")))
}
