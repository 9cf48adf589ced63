//! Warehouse access for the telemetry extractor.
//!
//! | Module     | Responsibility |
//! |------------|----------------|
//! | `backend`  | `Warehouse` / `Transfer` capability traits |
//! | `config`   | Connection parameters |
//! | `memory`   | Scripted in-memory implementations |
//! | `quote`    | Identifier and literal quoting |
//! | `row`      | Loosely-typed result rows |
//! | `snowsql`  | `snowsql` CLI transfer |
//! | `sql_api`  | Snowflake SQL API client |

#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod memory;
pub mod quote;
pub mod row;
pub mod snowsql;
pub mod sql_api;

pub use backend::{Transfer, TransferOutput, Warehouse};
pub use config::{ConnectionConfig, WarehouseContext};
pub use memory::{MemoryTransfer, MemoryWarehouse};
pub use quote::{qualified_name, quote_identifier, quote_literal};
pub use row::Row;
pub use snowsql::SnowSqlTransfer;
pub use sql_api::SqlApiWarehouse;
