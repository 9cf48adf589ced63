//! Manifest output.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use telemetry_types::{ExtractError, TableManifest};

/// Destination for per-table manifests.
pub trait ManifestSink {
    /// Persist `manifest` for its destination.
    ///
    /// # Errors
    ///
    /// Returns an `io` error when the manifest cannot be written.
    fn write_table_manifest(&self, manifest: &TableManifest) -> Result<(), ExtractError>;
}

/// Writes `<tables_dir>/<destination>.manifest` JSON files.
#[derive(Debug, Clone)]
pub struct FileManifestWriter {
    tables_dir: PathBuf,
}

impl FileManifestWriter {
    #[must_use]
    pub fn new(tables_dir: impl Into<PathBuf>) -> Self {
        Self {
            tables_dir: tables_dir.into(),
        }
    }

    #[must_use]
    pub fn manifest_path(&self, destination: &str) -> PathBuf {
        self.tables_dir.join(format!("{destination}.manifest"))
    }
}

impl ManifestSink for FileManifestWriter {
    fn write_table_manifest(&self, manifest: &TableManifest) -> Result<(), ExtractError> {
        let json = serde_json::to_string_pretty(manifest).map_err(|e| {
            ExtractError::internal("MANIFEST_ENCODE", format!("cannot encode manifest: {e}"))
        })?;
        std::fs::create_dir_all(&self.tables_dir)?;
        let path = self.manifest_path(&manifest.destination);
        std::fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "Manifest written");
        Ok(())
    }
}

/// Keeps manifests in memory instead of writing them.
#[derive(Debug, Default)]
pub struct CollectingManifestSink {
    manifests: Mutex<Vec<TableManifest>>,
}

impl CollectingManifestSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn manifests(&self) -> Vec<TableManifest> {
        self.manifests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ManifestSink for CollectingManifestSink {
    fn write_table_manifest(&self, manifest: &TableManifest) -> Result<(), ExtractError> {
        self.manifests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(manifest.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_types::{Column, Table};

    fn events_manifest() -> TableManifest {
        let mut table = Table::new("PUBLIC", "events");
        let mut id = Column::new("id", "NUMBER", false, "PUBLIC", "events").with_lengths(0, 38, 0);
        id.is_primary_key = true;
        table.add_column(id);
        TableManifest::for_table(&table, true)
    }

    #[test]
    fn writes_manifest_next_to_table_output() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileManifestWriter::new(dir.path().join("tables"));
        writer.write_table_manifest(&events_manifest()).unwrap();

        let path = dir.path().join("tables/events.csv.manifest");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["incremental"], true);
        assert_eq!(json["primary_key"], serde_json::json!(["id"]));
        assert_eq!(json["metadata"][0]["key"], "KBC.name");
        assert_eq!(json["metadata"][0]["value"], "events");
        assert!(json.get("destination").is_none());
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingManifestSink::new();
        sink.write_table_manifest(&events_manifest()).unwrap();
        sink.write_table_manifest(&events_manifest()).unwrap();
        assert_eq!(sink.manifests().len(), 2);
    }
}
