use anyhow::Context;

use telemetry_engine::checkpoint;
use telemetry_engine::manifest::FileManifestWriter;
use telemetry_engine::{Extractor, PipelineError};
use telemetry_state::{FileStateStore, StateStore};
use telemetry_warehouse::{SnowSqlTransfer, SqlApiWarehouse};

use super::ContextArgs;

/// Execute the `run` command: extract every eligible table and persist the
/// incremental state.
pub async fn execute(args: &ContextArgs) -> Result<(), PipelineError> {
    // 1. Configuration
    let loaded = super::load(args)?;
    let db = &loaded.config.image_parameters.db;

    // 2. Previous state
    let store = FileStateStore::for_data_dir(&args.data_dir);
    let input = store.load().context("Failed to read input state")?;
    tracing::info!(
        path = %store.input_path().display(),
        tables = input.len(),
        "Input state loaded"
    );

    // 3. Capabilities
    let warehouse = SqlApiWarehouse::connect(db)?;
    let transfer = SnowSqlTransfer::new(&loaded.config.image_parameters.snowsql, db)?;
    let manifests = FileManifestWriter::new(loaded.settings.tables_dir());

    // 4. Extract
    let extractor = Extractor::new(&warehouse, &transfer, &manifests, db.context(), loaded.settings);
    let outcome = extractor.extract(&input).await?;

    // 5. Persist state for the next run
    checkpoint::persist_run_state(&store, &input, &outcome.state)?;

    println!("Extraction completed successfully.");
    println!("  Tables exported:   {}", outcome.exported_tables());
    println!("  Rows exported:     {}", outcome.total_rows());
    println!("  Manifests written: {}", outcome.manifests_written);
    println!("  Duration:          {:.2}s", outcome.duration_secs);
    for report in &outcome.tables {
        match &report.watermark {
            Some(watermark) => println!("    {} ({} rows, watermark {watermark})", report.table, report.rows),
            None => println!("    {} ({} rows)", report.table, report.rows),
        }
    }

    Ok(())
}
