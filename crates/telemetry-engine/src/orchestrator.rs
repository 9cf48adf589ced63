//! Extraction orchestrator: runs every catalog table through export,
//! watermark capture and manifest emission.

use std::path::{Path, PathBuf};
use std::time::Instant;

use telemetry_types::contract::INCREMENTAL_NAME;
use telemetry_types::{
    ContractScope, ExtractError, ExtractionMode, IncrementalState, RequiredColumns, Table,
    TableManifest, TableRef,
};
use telemetry_warehouse::{Transfer, Warehouse, WarehouseContext};

use crate::catalog::{Catalog, CatalogBuilder};
use crate::config::types::{ExtractorConfig, TableSelection};
use crate::errors::PipelineError;
use crate::export::{remove_table_output, table_output_path, BulkExport, StagePath};
use crate::manifest::ManifestSink;
use crate::query::{build_latest_watermark_statement, build_select_statement, Identity};
use crate::result::{ExtractOutcome, TableReport};
use crate::retry::RetryPolicy;

/// Load flags in effect for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFlags {
    pub incremental_fetching: bool,
    pub incremental: bool,
}

/// Resolved run settings.
#[derive(Debug, Clone)]
pub struct ExtractSettings {
    pub mode: ExtractionMode,
    pub identity: Identity,
    pub contract: ContractScope,
    pub incremental_fetching: bool,
    pub incremental: bool,
    pub tables: Option<Vec<TableSelection>>,
    pub retry: RetryPolicy,
    pub max_file_size: u64,
    pub data_dir: PathBuf,
}

impl ExtractSettings {
    /// Resolve settings from a parsed configuration.
    ///
    /// # Errors
    ///
    /// Returns a `config` error for an unknown mode.
    pub fn from_config(
        config: &ExtractorConfig,
        identity: Identity,
        data_dir: impl Into<PathBuf>,
    ) -> Result<Self, ExtractError> {
        let params = &config.parameters;
        Ok(Self {
            mode: params.extraction_mode()?,
            identity,
            contract: params.contract,
            incremental_fetching: params.incremental_fetching,
            incremental: params.incremental,
            tables: params.tables.clone(),
            retry: params.retry.to_policy(),
            max_file_size: params.export.max_file_size,
            data_dir: data_dir.into(),
        })
    }

    /// `<data_dir>/out/tables`
    #[must_use]
    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join("out").join("tables")
    }

    #[must_use]
    pub fn whitelist(&self) -> Option<Vec<TableRef>> {
        self.tables
            .as_ref()
            .map(|tables| tables.iter().map(TableSelection::table_ref).collect())
    }

    #[must_use]
    pub fn required_columns(&self) -> RequiredColumns {
        RequiredColumns::resolve(self.contract, self.mode)
    }

    /// Whitelist overrides first, then the global flags.
    #[must_use]
    pub fn flags_for(&self, table: &Table) -> TableFlags {
        let selection = self.tables.as_ref().and_then(|tables| {
            tables
                .iter()
                .find(|t| t.schema == table.schema() && t.name == table.name())
        });
        TableFlags {
            incremental_fetching: selection
                .and_then(|s| s.incremental_fetching)
                .unwrap_or(self.incremental_fetching),
            incremental: selection
                .and_then(|s| s.incremental)
                .unwrap_or(self.incremental),
        }
    }
}

/// Runs one extraction against injected warehouse, transfer and manifest
/// capabilities.
pub struct Extractor<'a, W, T, M> {
    warehouse: &'a W,
    transfer: &'a T,
    manifests: &'a M,
    context: WarehouseContext,
    settings: ExtractSettings,
}

impl<'a, W, T, M> Extractor<'a, W, T, M>
where
    W: Warehouse,
    T: Transfer,
    M: ManifestSink,
{
    #[must_use]
    pub fn new(
        warehouse: &'a W,
        transfer: &'a T,
        manifests: &'a M,
        context: WarehouseContext,
        settings: ExtractSettings,
    ) -> Self {
        Self {
            warehouse,
            transfer,
            manifests,
            context,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ExtractSettings {
        &self.settings
    }

    fn catalog_builder(&self) -> CatalogBuilder<'a, W> {
        CatalogBuilder::new(
            self.warehouse,
            self.context.clone(),
            self.settings.required_columns(),
        )
    }

    /// Tables a run would export, without exporting anything.
    ///
    /// # Errors
    ///
    /// Returns warehouse errors from the metadata queries.
    pub async fn discover(&self) -> Result<Catalog, PipelineError> {
        let whitelist = self.settings.whitelist();
        Ok(self.catalog_builder().list_tables(whitelist.as_deref()).await?)
    }

    /// Export every catalog table and compute the next incremental state.
    ///
    /// `input` is the state left by the previous run. Any failure aborts
    /// the run; tables already downloaded stay on disk.
    ///
    /// # Errors
    ///
    /// Export failures surface as `user` errors wrapping the cause; a
    /// watermark query returning more than one row is an `internal` error.
    /// The watermark query only runs for tables that exported rows.
    pub async fn extract(&self, input: &IncrementalState) -> Result<ExtractOutcome, PipelineError> {
        let start = Instant::now();
        let settings = &self.settings;
        let tables_dir = settings.tables_dir();

        let catalog = self.discover().await?;
        tracing::info!(
            tables = catalog.len(),
            mode = %settings.mode,
            "Catalog discovered"
        );

        let export = BulkExport::new(
            self.warehouse,
            self.transfer,
            self.context.clone(),
            tables_dir.clone(),
            settings.max_file_size,
        );

        let mut state = IncrementalState::new();
        let mut reports = Vec::with_capacity(catalog.len());
        let mut exported: Vec<TableRef> = Vec::new();

        for table in &catalog {
            let flags = settings.flags_for(table);
            let prior = input.last_fetched_value(table.name());
            let rows = self.export_table(&export, table, flags, prior).await?;

            let watermark = if flags.incremental_fetching {
                if let Some(prior) = prior {
                    state.set_last_fetched_value(table.name(), prior);
                }
                // Nothing at or after the prior watermark: any row the
                // latest-row query could find is older, so keep the prior.
                let latest = if rows > 0 {
                    self.latest_watermark(table).await?
                } else {
                    None
                };
                if let Some(latest) = &latest {
                    state.set_last_fetched_value(table.name(), latest.as_str());
                }
                latest.or_else(|| prior.map(str::to_string))
            } else {
                None
            };

            if rows > 0 {
                exported.push(table.table_ref());
            } else {
                remove_empty_output(&tables_dir, table).await?;
            }

            reports.push(TableReport {
                table: table.id(),
                rows,
                watermark,
            });
        }

        let manifests_written = self.emit_manifests(&exported).await?;

        let outcome = ExtractOutcome {
            state,
            tables: reports,
            manifests_written,
            duration_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            tables = outcome.exported_tables(),
            rows = outcome.total_rows(),
            duration_secs = outcome.duration_secs,
            "Extraction finished"
        );
        Ok(outcome)
    }

    async fn export_table(
        &self,
        export: &BulkExport<'a, W, T>,
        table: &Table,
        flags: TableFlags,
        prior: Option<&str>,
    ) -> Result<u64, PipelineError> {
        let settings = &self.settings;
        let select = build_select_statement(
            table,
            settings.mode,
            &settings.identity,
            prior,
            flags.incremental_fetching,
        );
        let stage = StagePath::for_table(table, &settings.identity);
        tracing::info!(table = %table.id(), "Run query \"{select}\"");

        settings
            .retry
            .call("export", || export.export_and_download(table, &stage, &select))
            .await
            .map_err(|e| {
                PipelineError::Extract(ExtractError::user(
                    "EXPORT_FAILED",
                    format!("DB query failed: {}", e.message),
                    &e,
                ))
            })
    }

    async fn latest_watermark(&self, table: &Table) -> Result<Option<String>, PipelineError> {
        let settings = &self.settings;
        let sql = build_latest_watermark_statement(table, settings.mode, &settings.identity);
        let rows = settings
            .retry
            .call("watermark", || self.warehouse.fetch_all(&sql))
            .await
            .map_err(|e| {
                PipelineError::Extract(ExtractError::user(
                    "WATERMARK_QUERY_FAILED",
                    format!("DB query failed: {}", e.message),
                    &e,
                ))
            })?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(row.get(INCREMENTAL_NAME).map(str::to_string)),
            _ => Err(PipelineError::Extract(ExtractError::internal(
                "WATERMARK_NOT_UNIQUE",
                format!(
                    "latest-row query for table '{}' returned {} rows",
                    table.id(),
                    rows.len()
                ),
            ))),
        }
    }

    async fn emit_manifests(&self, exported: &[TableRef]) -> Result<usize, PipelineError> {
        let finalized = self.catalog_builder().list_tables(Some(exported)).await?;
        for table in &finalized {
            let flags = self.settings.flags_for(table);
            let manifest = TableManifest::for_table(table, flags.incremental);
            self.manifests.write_table_manifest(&manifest)?;
            tracing::info!(
                table = %table.id(),
                destination = %manifest.destination,
                incremental = flags.incremental,
                "Manifest written"
            );
        }
        Ok(finalized.len())
    }
}

async fn remove_empty_output(tables_dir: &Path, table: &Table) -> Result<(), PipelineError> {
    let path = table_output_path(tables_dir, table.name());
    if remove_table_output(&path).await.map_err(ExtractError::from)? {
        tracing::info!(table = %table.id(), path = %path.display(), "Removed output of empty table");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_config_str;

    fn config(parameters: &str) -> ExtractorConfig {
        parse_config_str(&format!(
            r##"{{
                "parameters": {parameters},
                "image_parameters": {{
                    "db": {{
                        "host": "acme.snowflakecomputing.com",
                        "user": "U",
                        "#password": "P",
                        "database": "DB",
                        "schema": "PUBLIC",
                        "warehouse": "WH"
                    }}
                }}
            }}"##
        ))
        .unwrap()
    }

    #[test]
    fn unknown_mode_fails_settings_resolution() {
        let err = ExtractSettings::from_config(
            &config(r#"{"mode": "galaxy"}"#),
            Identity::new("42", "eu-1"),
            "/data",
        )
        .unwrap_err();
        assert_eq!(err.code, "UNKNOWN_MODE");
    }

    #[test]
    fn table_overrides_take_precedence() {
        let settings = ExtractSettings::from_config(
            &config(
                r#"{
                    "incrementalFetching": true,
                    "incremental": false,
                    "tables": [
                        {"schema": "PUBLIC", "name": "events", "incrementalFetching": false, "incremental": true},
                        {"schema": "PUBLIC", "name": "audit"}
                    ]
                }"#,
            ),
            Identity::new("42", "eu-1"),
            "/data",
        )
        .unwrap();

        assert_eq!(
            settings.flags_for(&Table::new("PUBLIC", "events")),
            TableFlags {
                incremental_fetching: false,
                incremental: true
            }
        );
        assert_eq!(
            settings.flags_for(&Table::new("PUBLIC", "audit")),
            TableFlags {
                incremental_fetching: true,
                incremental: false
            }
        );
        assert_eq!(settings.whitelist().unwrap().len(), 2);
        assert_eq!(settings.tables_dir(), PathBuf::from("/data/out/tables"));
    }

    #[test]
    fn active_mode_contract_follows_mode() {
        let settings = ExtractSettings::from_config(
            &config(r#"{"mode": "organization", "contract": "active_mode"}"#),
            Identity::new("42", "eu-1"),
            "/data",
        )
        .unwrap();
        assert_eq!(
            settings.required_columns().names(),
            &["dst_proj_company", "dst_stack_company", "dst_timestamp"]
        );
    }
}
