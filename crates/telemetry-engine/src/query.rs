//! Per-table SQL generation.
//!
//! Statements are assembled by string composition; every identifier goes
//! through [`quote_identifier`] and every value through [`quote_literal`].

use telemetry_types::contract::INCREMENTAL_NAME;
use telemetry_types::{ExtractionMode, Table};
use telemetry_warehouse::{qualified_name, quote_identifier, quote_literal};

/// Tenant and stack the run extracts rows for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub tenant_id: String,
    pub stack_id: String,
}

impl Identity {
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, stack_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            stack_id: stack_id.into(),
        }
    }
}

fn scope_predicate(mode: ExtractionMode, identity: &Identity) -> String {
    let markers = mode.markers();
    format!(
        "{} = {} AND {} = {}",
        quote_identifier(markers.tenant),
        quote_literal(&identity.tenant_id),
        quote_identifier(markers.stack),
        quote_literal(&identity.stack_id)
    )
}

/// Rows of `table` belonging to `identity`.
///
/// With incremental fetching the result is ordered by the incremental
/// column and, when a watermark is known, bounded below by it (inclusive).
#[must_use]
pub fn build_select_statement(
    table: &Table,
    mode: ExtractionMode,
    identity: &Identity,
    watermark: Option<&str>,
    incremental_fetching: bool,
) -> String {
    let mut sql = format!(
        "SELECT * FROM {} WHERE {}",
        qualified_name(table.schema(), table.name()),
        scope_predicate(mode, identity)
    );
    if incremental_fetching {
        let column = quote_identifier(INCREMENTAL_NAME);
        if let Some(watermark) = watermark {
            sql.push_str(&format!(" AND {column} >= {}", quote_literal(watermark)));
        }
        sql.push_str(&format!(" ORDER BY {column}"));
    }
    sql
}

/// Latest incremental-column value of `identity`'s rows, as text.
#[must_use]
pub fn build_latest_watermark_statement(
    table: &Table,
    mode: ExtractionMode,
    identity: &Identity,
) -> String {
    let column = quote_identifier(INCREMENTAL_NAME);
    format!(
        "SELECT TO_VARCHAR({column}) AS {column} FROM {} WHERE {} ORDER BY {column} DESC LIMIT 1",
        qualified_name(table.schema(), table.name()),
        scope_predicate(mode, identity)
    )
}
