//! JSON file-backed [`StateStore`].

use std::path::{Path, PathBuf};

use telemetry_types::IncrementalState;

use crate::backend::StateStore;
use crate::error::{self, StateError};

/// Reads the previous run's state from one file and writes the new state to
/// another, following the component data-directory layout.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    input: PathBuf,
    output: PathBuf,
}

impl FileStateStore {
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// `<data_dir>/in/state.json` in, `<data_dir>/out/state.json` out.
    #[must_use]
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::new(
            data_dir.join("in").join("state.json"),
            data_dir.join("out").join("state.json"),
        )
    }

    #[must_use]
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> error::Result<IncrementalState> {
        let raw = match std::fs::read_to_string(&self.input) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.input.display(), "No input state file");
                return Ok(IncrementalState::new());
            }
            Err(e) => return Err(io_error(&self.input, e)),
        };
        if raw.trim().is_empty() {
            return Ok(IncrementalState::new());
        }
        serde_json::from_str(&raw).map_err(|source| StateError::Json {
            path: self.input.display().to_string(),
            source,
        })
    }

    fn save(&self, state: &IncrementalState) -> error::Result<()> {
        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|source| StateError::Json {
            path: self.output.display().to_string(),
            source,
        })?;
        std::fs::write(&self.output, json).map_err(|e| io_error(&self.output, e))?;
        tracing::debug!(path = %self.output.display(), tables = state.len(), "State written");
        Ok(())
    }
}
