mod commands;
mod logging;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::ContextArgs;

#[derive(Parser)]
#[command(
    name = "telemetry-extractor",
    version,
    about = "Extracts tenant-scoped telemetry tables from Snowflake"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every eligible table and persist the incremental state
    Run {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// List the tables a run would export
    Discover {
        #[command(flatten)]
        context: ContextArgs,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Run { context } => commands::run::execute(&context).await,
        Commands::Discover { context } => commands::discover::execute(&context).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_explicit_context() {
        let cli = Cli::try_parse_from([
            "telemetry-extractor",
            "--log-level",
            "debug",
            "run",
            "--data-dir",
            "/tmp/data",
            "--project-id",
            "42",
            "--stack-id",
            "eu-1",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Commands::Run { context } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(context.project_id, "42");
        assert_eq!(context.stack_id, "eu-1");
        assert_eq!(
            context.config_path(),
            std::path::PathBuf::from("/tmp/data/config.json")
        );
    }

    #[test]
    fn explicit_config_overrides_default_location() {
        let cli = Cli::try_parse_from([
            "telemetry-extractor",
            "discover",
            "--data-dir",
            "/tmp/data",
            "--config",
            "/etc/extractor.json",
        ])
        .unwrap();
        let Commands::Discover { context } = cli.command else {
            panic!("expected discover");
        };
        assert_eq!(
            context.config_path(),
            std::path::PathBuf::from("/etc/extractor.json")
        );
    }
}
