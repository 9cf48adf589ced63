//! Shared catalog, contract, state, manifest and error model types.
//!
//! Pure data only; the warehouse driver, engine and state store all depend
//! on this crate and nothing here performs I/O.

pub mod catalog;
pub mod contract;
pub mod datatype;
pub mod error;
pub mod manifest;
pub mod state;

pub use catalog::{Column, ColumnLength, Table, TableRef};
pub use contract::{ContractScope, ExtractionMode, MarkerColumns, RequiredColumns};
pub use error::{ErrorCategory, ExtractError};
pub use manifest::{MetadataEntry, TableManifest};
pub use state::{IncrementalState, TableState};
