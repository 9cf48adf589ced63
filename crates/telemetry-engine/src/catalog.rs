//! Schema catalog discovery.
//!
//! Lists the tables of the configured schema, attaches their columns and
//! primary keys, and keeps only tables satisfying the required-column
//! contract. Warehouse rows are mapped into [`Table`]/[`Column`] here and
//! never leave this module.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use telemetry_types::{Column, ExtractError, RequiredColumns, Table, TableRef};
use telemetry_warehouse::{
    qualified_name, quote_identifier, quote_literal, Row, Warehouse, WarehouseContext,
};

const INFORMATION_SCHEMA: &str = "INFORMATION_SCHEMA";
const STAGING_PREFIX: &str = "staging";

/// Exportable tables in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tables: Vec<Table>,
}

impl Catalog {
    #[must_use]
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Table> {
        self.tables.iter()
    }

    /// Table by its `schema.name` id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id() == id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.tables.iter().map(Table::id).collect()
    }

    #[must_use]
    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Table;
    type IntoIter = std::slice::Iter<'a, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

/// Builds a [`Catalog`] from warehouse metadata queries.
pub struct CatalogBuilder<'a, W> {
    warehouse: &'a W,
    context: WarehouseContext,
    contract: RequiredColumns,
}

impl<'a, W: Warehouse> CatalogBuilder<'a, W> {
    #[must_use]
    pub fn new(warehouse: &'a W, context: WarehouseContext, contract: RequiredColumns) -> Self {
        Self {
            warehouse,
            context,
            contract,
        }
    }

    /// Discover exportable tables.
    ///
    /// `None` lists every table in the schema; `Some(list)` keeps only the
    /// exact `(schema, name)` pairs given. An empty list yields an empty
    /// catalog without touching the warehouse.
    ///
    /// # Errors
    ///
    /// Propagates warehouse errors unchanged; the caller owns retries.
    pub async fn list_tables(&self, whitelist: Option<&[TableRef]>) -> Result<Catalog, ExtractError> {
        if whitelist.is_some_and(<[TableRef]>::is_empty) {
            return Ok(Catalog::default());
        }

        let mut tables = self.query_tables(whitelist).await?;
        if tables.is_empty() {
            return Ok(Catalog::default());
        }

        let primary_keys = self.query_primary_keys().await?;
        let columns = self.query_columns(&tables).await?;

        let index: HashMap<String, usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id(), i))
            .collect();
        for mut column in columns {
            let table_id = column.table_id();
            column.is_primary_key = primary_keys
                .get(&table_id)
                .is_some_and(|keys| keys.contains(&column.name));
            match index.get(&table_id) {
                Some(i) => tables[*i].add_column(column),
                None => tracing::debug!(
                    table = %table_id,
                    column = %column.name,
                    "Ignoring column of unlisted table"
                ),
            }
        }

        tables.retain(|table| {
            let missing = table.missing_required_columns(&self.contract);
            if missing.is_empty() {
                return true;
            }
            tracing::info!(
                "Missing \"{}\" columns for table \"{}\".",
                missing.join(", "),
                table.name()
            );
            false
        });

        tracing::debug!(tables = tables.len(), "Catalog built");
        Ok(Catalog::new(tables))
    }

    async fn query_tables(&self, whitelist: Option<&[TableRef]>) -> Result<Vec<Table>, ExtractError> {
        let sql = format!(
            "SHOW TABLES IN SCHEMA {}",
            qualified_name(&self.context.database, &self.context.schema)
        );
        let rows = self.warehouse.fetch_all(&sql).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let schema = row.require("schema_name")?;
            let name = row.require("name")?;
            if is_skipped(schema, name, whitelist) {
                continue;
            }
            tables.push(Table::new(schema, name));
        }
        tables.sort_by(|a, b| natural_cmp(a.name(), b.name()));
        Ok(tables)
    }

    async fn query_primary_keys(&self) -> Result<HashMap<String, HashSet<String>>, ExtractError> {
        let sql = format!(
            "SHOW PRIMARY KEYS IN DATABASE {}",
            quote_identifier(&self.context.database)
        );
        let mut keys: HashMap<String, HashSet<String>> = HashMap::new();
        for row in self.warehouse.fetch_all(&sql).await? {
            let table_id = format!("{}.{}", row.require("schema_name")?, row.require("table_name")?);
            keys.entry(table_id)
                .or_default()
                .insert(row.require("column_name")?.to_string());
        }
        Ok(keys)
    }

    async fn query_columns(&self, tables: &[Table]) -> Result<Vec<Column>, ExtractError> {
        let rows = self.warehouse.fetch_all(&columns_statement(tables)).await?;
        rows.iter().map(column_from_row).collect()
    }
}

fn is_skipped(schema: &str, name: &str, whitelist: Option<&[TableRef]>) -> bool {
    if schema == INFORMATION_SCHEMA || name.starts_with(STAGING_PREFIX) {
        return true;
    }
    whitelist.is_some_and(|list| !list.iter().any(|t| t.schema == schema && t.name == name))
}

/// `information_schema.columns` query restricted to `tables`.
fn columns_statement(tables: &[Table]) -> String {
    let predicates: Vec<String> = tables
        .iter()
        .map(|t| {
            format!(
                "(table_schema = {} AND table_name = {})",
                quote_literal(t.schema()),
                quote_literal(t.name())
            )
        })
        .collect();
    format!(
        "SELECT * FROM information_schema.columns WHERE {} ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION",
        predicates.join(" OR ")
    )
}

fn column_from_row(row: &Row) -> Result<Column, ExtractError> {
    let nullable = row
        .get("IS_NULLABLE")
        .is_some_and(|v| v.eq_ignore_ascii_case("YES"));
    Ok(Column::new(
        row.require("COLUMN_NAME")?,
        row.require("DATA_TYPE")?,
        nullable,
        row.require("TABLE_SCHEMA")?,
        row.require("TABLE_NAME")?,
    )
    .with_lengths(
        row.get_i64("CHARACTER_MAXIMUM_LENGTH")?.unwrap_or(0),
        row.get_i64("NUMERIC_PRECISION")?.unwrap_or(0),
        row.get_i64("NUMERIC_SCALE")?.unwrap_or(0),
    ))
}

/// Natural string ordering: digit runs compare by numeric value, so
/// `table2` sorts before `table10`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ab, bb) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);

    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let start_i = i;
            while i < ab.len() && ab[i].is_ascii_digit() {
                i += 1;
            }
            let start_j = j;
            while j < bb.len() && bb[j].is_ascii_digit() {
                j += 1;
            }
            let run_a = trim_leading_zeros(&ab[start_i..i]);
            let run_b = trim_leading_zeros(&bb[start_j..j]);
            let ord = run_a.len().cmp(&run_b.len()).then_with(|| run_a.cmp(run_b));
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ord = ab[i].cmp(&bb[j]);
            if ord != Ordering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }

    (ab.len() - i).cmp(&(bb.len() - j)).then_with(|| a.cmp(b))
}

fn trim_leading_zeros(digits: &[u8]) -> &[u8] {
    let first = digits.iter().position(|d| *d != b'0').unwrap_or(digits.len());
    &digits[first..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use telemetry_types::contract::ALL_MARKER_COLUMNS;
    use telemetry_types::{ContractScope, ExtractionMode};
    use telemetry_warehouse::MemoryWarehouse;

    fn context() -> WarehouseContext {
        WarehouseContext {
            warehouse: "WH".into(),
            database: "TELEMETRY".into(),
            schema: "PUBLIC".into(),
        }
    }

    fn table_row(schema: &str, name: &str) -> Row {
        Row::from_pairs([("schema_name", schema), ("name", name)])
    }

    fn column_row(table: &str, column: &str, data_type: &str) -> Row {
        Row::from_pairs([
            ("TABLE_SCHEMA", "PUBLIC"),
            ("TABLE_NAME", table),
            ("COLUMN_NAME", column),
            ("DATA_TYPE", data_type),
            ("IS_NULLABLE", "YES"),
        ])
        .with_null("CHARACTER_MAXIMUM_LENGTH")
        .with_null("NUMERIC_PRECISION")
        .with_null("NUMERIC_SCALE")
    }

    fn contract_rows(table: &str) -> Vec<Row> {
        ALL_MARKER_COLUMNS
            .iter()
            .map(|c| column_row(table, c, "TEXT"))
            .collect()
    }

    fn builder(warehouse: &MemoryWarehouse) -> CatalogBuilder<'_, MemoryWarehouse> {
        CatalogBuilder::new(warehouse, context(), RequiredColumns::all_modes())
    }

    #[tokio::test]
    async fn empty_whitelist_issues_no_query() {
        let warehouse = MemoryWarehouse::new();
        let catalog = builder(&warehouse).list_tables(Some(&[])).await.unwrap();
        assert!(catalog.is_empty());
        assert!(warehouse.executed().is_empty());
    }

    #[tokio::test]
    async fn nothing_listed_stops_after_first_query() {
        let warehouse = MemoryWarehouse::new();
        warehouse.respond(
            "SHOW TABLES",
            vec![table_row("INFORMATION_SCHEMA", "TABLES"), table_row("PUBLIC", "staging_events")],
        );
        let catalog = builder(&warehouse).list_tables(None).await.unwrap();
        assert!(catalog.is_empty());
        assert_eq!(warehouse.executed(), vec!["SHOW TABLES IN SCHEMA \"TELEMETRY\".\"PUBLIC\""]);
    }

    #[tokio::test]
    async fn tables_sorted_naturally_and_primary_keys_flagged() {
        let warehouse = MemoryWarehouse::new();
        warehouse
            .respond(
                "SHOW TABLES",
                vec![table_row("PUBLIC", "table10"), table_row("PUBLIC", "table2")],
            )
            .respond(
                "SHOW PRIMARY KEYS",
                vec![Row::from_pairs([
                    ("schema_name", "PUBLIC"),
                    ("table_name", "table2"),
                    ("column_name", "dst_timestamp"),
                ])],
            )
            .respond(
                "information_schema.columns",
                [contract_rows("table10"), contract_rows("table2")].concat(),
            );

        let catalog = builder(&warehouse).list_tables(None).await.unwrap();
        assert_eq!(catalog.ids(), vec!["PUBLIC.table2", "PUBLIC.table10"]);

        let table2 = catalog.get("PUBLIC.table2").unwrap();
        assert_eq!(table2.primary_key(), vec!["dst_timestamp"]);
        assert!(catalog.get("PUBLIC.table10").unwrap().primary_key().is_empty());
        assert_eq!(table2.columns().len(), 7);
    }

    #[tokio::test]
    async fn columns_query_scopes_listed_tables() {
        let warehouse = MemoryWarehouse::new();
        warehouse.respond("SHOW TABLES", vec![table_row("PUBLIC", "o'brien")]);
        builder(&warehouse).list_tables(None).await.unwrap();

        let executed = warehouse.executed();
        assert_eq!(executed[1], "SHOW PRIMARY KEYS IN DATABASE \"TELEMETRY\"");
        assert_eq!(
            executed[2],
            "SELECT * FROM information_schema.columns WHERE (table_schema = 'PUBLIC' AND table_name = 'o''brien') ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION"
        );
    }

    #[tokio::test]
    async fn whitelist_matches_schema_and_name_exactly() {
        let warehouse = MemoryWarehouse::new();
        warehouse
            .respond(
                "SHOW TABLES",
                vec![
                    table_row("PUBLIC", "events"),
                    table_row("OTHER", "events"),
                    table_row("PUBLIC", "audit"),
                ],
            )
            .respond("information_schema.columns", contract_rows("events"));

        let whitelist = [TableRef::new("PUBLIC", "events")];
        let catalog = builder(&warehouse).list_tables(Some(&whitelist)).await.unwrap();
        assert_eq!(catalog.ids(), vec!["PUBLIC.events"]);
    }

    #[tokio::test]
    async fn tables_missing_markers_are_dropped() {
        let mut legacy = contract_rows("legacy");
        legacy.retain(|row| row.get("COLUMN_NAME") != Some("dst_stack_company"));

        let warehouse = MemoryWarehouse::new();
        warehouse
            .respond(
                "SHOW TABLES",
                vec![table_row("PUBLIC", "events"), table_row("PUBLIC", "legacy")],
            )
            .respond(
                "information_schema.columns",
                [contract_rows("events"), legacy].concat(),
            );

        let catalog = builder(&warehouse).list_tables(None).await.unwrap();
        assert_eq!(catalog.ids(), vec!["PUBLIC.events"]);
    }

    #[tokio::test]
    async fn active_mode_contract_accepts_single_pair() {
        let warehouse = MemoryWarehouse::new();
        warehouse
            .respond("SHOW TABLES", vec![table_row("PUBLIC", "events")])
            .respond(
                "information_schema.columns",
                vec![
                    column_row("events", "dst_proj_single", "TEXT"),
                    column_row("events", "dst_stack_single", "TEXT"),
                    column_row("events", "dst_timestamp", "TIMESTAMP_NTZ"),
                ],
            );

        let contract = RequiredColumns::resolve(ContractScope::ActiveMode, ExtractionMode::Project);
        let catalog = CatalogBuilder::new(&warehouse, context(), contract)
            .list_tables(None)
            .await
            .unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn null_lengths_read_as_zero() {
        let column = column_from_row(&column_row("events", "payload", "VARCHAR")).unwrap();
        assert_eq!(column.character_maximum_length, 0);
        assert!(column.is_nullable);
        assert_eq!(column.table_id(), "PUBLIC.events");
    }

    #[test]
    fn natural_order_examples() {
        let mut names = vec!["table10", "table2", "table1", "audit", "table02b"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["audit", "table1", "table2", "table02b", "table10"]);
        assert_eq!(natural_cmp("a", "a"), Ordering::Equal);
        assert_eq!(natural_cmp("a1", "a01"), Ordering::Greater);
    }

    proptest! {
        #[test]
        fn numeric_suffixes_sort_by_value(a in 0u32..100_000, b in 0u32..100_000) {
            let (x, y) = (format!("table{a}"), format!("table{b}"));
            prop_assert_eq!(natural_cmp(&x, &y), a.cmp(&b));
        }

        #[test]
        fn natural_order_is_antisymmetric(x in "[a-c0-9]{0,6}", y in "[a-c0-9]{0,6}") {
            prop_assert_eq!(natural_cmp(&x, &y), natural_cmp(&y, &x).reverse());
        }
    }
}
