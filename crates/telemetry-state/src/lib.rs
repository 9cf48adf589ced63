//! Incremental state persistence for the telemetry extractor.
//!
//! Provides the [`StateStore`] trait and a [`FileStateStore`]
//! implementation reading `in/state.json` and writing `out/state.json`
//! under the component data directory.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod file;

pub use backend::StateStore;
pub use error::StateError;
pub use file::FileStateStore;
