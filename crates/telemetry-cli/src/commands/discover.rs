use anyhow::Context;

use telemetry_engine::{CatalogBuilder, PipelineError};
use telemetry_warehouse::SqlApiWarehouse;

use super::ContextArgs;

/// Execute the `discover` command: list the tables a run would export.
pub async fn execute(args: &ContextArgs) -> Result<(), PipelineError> {
    // 1. Configuration
    let loaded = super::load(args)?;
    let settings = &loaded.settings;
    let db = &loaded.config.image_parameters.db;

    // 2. Catalog only, nothing is exported
    let warehouse = SqlApiWarehouse::connect(db)?;
    let whitelist = settings.whitelist();
    let catalog = CatalogBuilder::new(&warehouse, db.context(), settings.required_columns())
        .list_tables(whitelist.as_deref())
        .await?;

    // 3. Print human-readable catalog
    println!("Discovered {} exportable table(s):\n", catalog.len());
    for table in &catalog {
        let flags = settings.flags_for(table);
        println!("Table: {}", table.id());
        println!(
            "  Incremental fetching: {}, incremental load: {}",
            flags.incremental_fetching, flags.incremental
        );
        let primary_key = table.primary_key();
        if !primary_key.is_empty() {
            println!("  Primary key: {}", primary_key.join(", "));
        }
        println!("  Columns:");
        for col in table.columns() {
            let nullable = if col.is_nullable { "NULL" } else { "NOT NULL" };
            println!("    - {} ({}, {})", col.name, col.data_type, nullable);
        }
        println!();
    }

    // 4. Print machine-readable JSON
    let tables = catalog.into_tables();
    let json = serde_json::to_string(&tables).context("Failed to encode catalog")?;
    println!("@@CATALOG_JSON@@{json}");

    Ok(())
}
