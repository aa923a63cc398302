//! Standards-based metadata dialect over ANSI `information_schema`.
//!
//! This is the fallback for any engine without a specialized strategy. It
//! delegates directly to the standard catalog views through the connection's
//! [`MetaQuery`] port and applies no engine-specific correction, so it stays
//! correct for any standards-compliant engine.
//!
//! One deliberate gap: ANSI `information_schema` defines no index view, so
//! [`indexes`](GenericMetaDataDialect::indexes) fails with the non-fatal
//! `Unsupported` error and the pipeline degrades it to an empty sequence.
//! Specialized dialects override it with their engine's system views.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, PrimaryKeyRecord, SqlType, TableKind,
    TableRecord, TableRef,
};
use crate::core::sequence::RecordSequence;
use crate::core::traits::{MetaDataDialect, MetaQuery, TableFilter};
use crate::core::value::MetaRow;
use crate::error::{IntrospectError, Result};

/// Case the engine stores unquoted identifiers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentCase {
    Preserve,
    Upper,
    Lower,
}

impl IdentCase {
    pub fn apply(&self, name: &str) -> String {
        match self {
            IdentCase::Preserve => name.to_string(),
            IdentCase::Upper => name.to_uppercase(),
            IdentCase::Lower => name.to_lowercase(),
        }
    }
}

/// Generic metadata dialect backed by ANSI `information_schema`.
pub struct GenericMetaDataDialect {
    conn: Arc<dyn MetaQuery>,
    case: IdentCase,
}

impl GenericMetaDataDialect {
    pub fn new(conn: Arc<dyn MetaQuery>) -> Self {
        Self::with_case(conn, IdentCase::Preserve)
    }

    /// Variant used by specialized dialects wrapping this one on a folding
    /// engine: every filter value passes through the case fold before it is
    /// bound, so mixed-case caller input still matches stored identifiers.
    pub fn with_case(conn: Arc<dyn MetaQuery>, case: IdentCase) -> Self {
        Self { conn, case }
    }

    pub(crate) fn connection(&self) -> &Arc<dyn MetaQuery> {
        &self.conn
    }

    fn fold(&self, name: &str) -> String {
        self.case.apply(name)
    }
}

#[async_trait]
impl MetaDataDialect for GenericMetaDataDialect {
    fn name(&self) -> &str {
        "generic"
    }

    fn normalize_ident(&self, name: &str) -> String {
        self.fold(name)
    }

    async fn tables(&self, filter: &TableFilter) -> Result<RecordSequence<TableRecord>> {
        let mut sql = String::from(
            "SELECT table_catalog, table_schema, table_name, table_type \
             FROM information_schema.tables \
             WHERE table_type IN ('BASE TABLE', 'TABLE', 'VIEW')",
        );
        let mut params = Vec::new();
        if let Some(catalog) = &filter.catalog {
            and_filter(&*self.conn, &mut sql, &mut params, "table_catalog", "=", &self.fold(catalog));
        }
        if let Some(schema) = &filter.schema {
            and_filter(&*self.conn, &mut sql, &mut params, "table_schema", "=", &self.fold(schema));
        }
        if let Some(pattern) = &filter.table_pattern {
            and_filter(&*self.conn, &mut sql, &mut params, "table_name", "LIKE", &self.fold(pattern));
        }
        sql.push_str(" ORDER BY table_schema, table_name");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?;
        Ok(RecordSequence::mapped(rows, table_from_row))
    }

    async fn columns(&self, table: &TableRef) -> Result<RecordSequence<ColumnRecord>> {
        let mut sql = String::from(
            "SELECT column_name, data_type, character_maximum_length, numeric_precision, \
                    numeric_scale, is_nullable, ordinal_position, column_default \
             FROM information_schema.columns WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(catalog) = &table.catalog {
            and_filter(&*self.conn, &mut sql, &mut params, "table_catalog", "=", &self.fold(catalog));
        }
        if let Some(schema) = &table.schema {
            and_filter(&*self.conn, &mut sql, &mut params, "table_schema", "=", &self.fold(schema));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "table_name", "=", &self.fold(&table.name));
        sql.push_str(" ORDER BY ordinal_position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?;
        Ok(RecordSequence::mapped(rows, column_from_row))
    }

    async fn primary_keys(&self, table: &TableRef) -> Result<RecordSequence<PrimaryKeyRecord>> {
        let mut sql = String::from(
            "SELECT tc.constraint_name, kcu.column_name, kcu.ordinal_position \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_name = tc.constraint_name \
              AND kcu.constraint_schema = tc.constraint_schema \
              AND kcu.table_name = tc.table_name \
             WHERE tc.constraint_type = 'PRIMARY KEY'",
        );
        let mut params = Vec::new();
        if let Some(catalog) = &table.catalog {
            and_filter(&*self.conn, &mut sql, &mut params, "tc.table_catalog", "=", &self.fold(catalog));
        }
        if let Some(schema) = &table.schema {
            and_filter(&*self.conn, &mut sql, &mut params, "tc.table_schema", "=", &self.fold(schema));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "tc.table_name", "=", &self.fold(&table.name));
        sql.push_str(" ORDER BY kcu.ordinal_position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(
            fold_primary_key(table, &rows)?.into_iter().collect(),
        ))
    }

    async fn foreign_keys(&self, table: &TableRef) -> Result<RecordSequence<ForeignKeyRecord>> {
        // The referenced side comes off the unique constraint, so targets
        // outside the scanned schema still resolve.
        let mut sql = String::from(
            "SELECT rc.constraint_name, kcu.column_name, kcu.ordinal_position, \
                    ref.table_catalog AS ref_catalog, ref.table_schema AS ref_schema, \
                    ref.table_name AS ref_table, ref.column_name AS ref_column \
             FROM information_schema.referential_constraints rc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_name = rc.constraint_name \
              AND kcu.constraint_schema = rc.constraint_schema \
             JOIN information_schema.key_column_usage ref \
               ON ref.constraint_name = rc.unique_constraint_name \
              AND ref.constraint_schema = rc.unique_constraint_schema \
              AND ref.ordinal_position = kcu.position_in_unique_constraint \
             WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(catalog) = &table.catalog {
            and_filter(&*self.conn, &mut sql, &mut params, "kcu.table_catalog", "=", &self.fold(catalog));
        }
        if let Some(schema) = &table.schema {
            and_filter(&*self.conn, &mut sql, &mut params, "kcu.table_schema", "=", &self.fold(schema));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "kcu.table_name", "=", &self.fold(&table.name));
        sql.push_str(" ORDER BY rc.constraint_name, kcu.ordinal_position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(fold_foreign_keys(table, &rows)?))
    }

    async fn indexes(&self, _table: &TableRef) -> Result<RecordSequence<IndexRecord>> {
        // No standard information_schema view exists for indexes.
        Err(IntrospectError::unsupported(self.name(), "indexes"))
    }

    async fn close(&self) {
        self.conn.close().await;
    }
}

// =============================================================================
// SQL building and row folding shared with the specialized dialects
// =============================================================================

/// Append `AND <column> <op> <placeholder>` and bind the value.
pub(crate) fn and_filter(
    conn: &dyn MetaQuery,
    sql: &mut String,
    params: &mut Vec<String>,
    column: &str,
    op: &str,
    value: &str,
) {
    let _ = write!(sql, " AND {} {} {}", column, op, conn.placeholder(params.len() + 1));
    params.push(value.to_string());
}

pub(crate) fn param_refs(params: &[String]) -> Vec<&str> {
    params.iter().map(String::as_str).collect()
}

/// Map a table enumeration row. Expects `table_name` plus optional
/// `table_catalog`, `table_schema`, `table_type`, and `remarks` columns;
/// dialects whose catalogs use other labels alias them in the query.
pub(crate) fn table_from_row(row: MetaRow) -> Result<TableRecord> {
    Ok(TableRecord {
        catalog: row.get_string("table_catalog").filter(|s| !s.is_empty()),
        schema: row.get_string("table_schema").filter(|s| !s.is_empty()),
        name: row.require_str("table_name")?.to_string(),
        kind: TableKind::from_type_name(row.get_str("table_type").unwrap_or("TABLE")),
        remarks: row
            .get_string("remarks")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    })
}

/// Map a column enumeration row. Column size follows the usual metadata
/// convention: character length for string types, precision for numerics.
pub(crate) fn column_from_row(row: MetaRow) -> Result<ColumnRecord> {
    let name = row.require_str("column_name")?.to_string();
    let type_name = row.require_str("data_type")?.to_string();
    let column_size = row
        .get_i64("character_maximum_length")
        .filter(|v| *v > 0)
        .or_else(|| row.get_i64("numeric_precision").filter(|v| *v > 0))
        .map(|v| v as u32);

    Ok(ColumnRecord {
        name,
        sql_type: SqlType::from_type_name(&type_name),
        type_name,
        column_size,
        decimal_digits: row.get_i64("numeric_scale").map(|v| v as i32),
        nullable: row.get_bool("is_nullable").into(),
        ordinal: row.get_i64("ordinal_position").unwrap_or(0) as u32,
        default_value: row
            .get_string("column_default")
            .filter(|s| !s.trim().is_empty()),
    })
}

/// Assemble the single logical primary key from its key-part rows.
/// Expects `column_name`, `ordinal_position`, and optional `constraint_name`.
pub(crate) fn fold_primary_key(
    table: &TableRef,
    rows: &[MetaRow],
) -> Result<Option<PrimaryKeyRecord>> {
    if rows.is_empty() {
        return Ok(None);
    }
    let mut name = None;
    let mut parts = Vec::with_capacity(rows.len());
    for row in rows {
        if name.is_none() {
            name = row.get_string("constraint_name");
        }
        let ordinal = row.get_i64("ordinal_position").unwrap_or(parts.len() as i64 + 1);
        parts.push((ordinal, row.require_str("column_name")?.to_string()));
    }
    parts.sort_by_key(|(ordinal, _)| *ordinal);

    Ok(Some(PrimaryKeyRecord {
        table: table.clone(),
        name,
        columns: parts.into_iter().map(|(_, column)| column).collect(),
    }))
}

/// Group foreign-key part rows into one record per constraint.
///
/// Drivers are known to return duplicate rows for composite keys; parts are
/// de-duplicated by (constraint name, ordinal). Expects `constraint_name`,
/// `column_name`, `ordinal_position`, `ref_schema`, `ref_table`,
/// `ref_column`, and optional `ref_catalog`.
pub(crate) fn fold_foreign_keys(
    table: &TableRef,
    rows: &[MetaRow],
) -> Result<Vec<ForeignKeyRecord>> {
    let mut seen: HashSet<(String, i64)> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut parts: HashMap<String, Vec<(i64, String, String)>> = HashMap::new();
    let mut targets: HashMap<String, TableRef> = HashMap::new();

    for row in rows {
        let constraint = row.require_str("constraint_name")?.to_string();
        let ordinal = row.get_i64("ordinal_position").unwrap_or(0);
        if !seen.insert((constraint.clone(), ordinal)) {
            debug!(
                "dropping duplicate key part {}#{} reported by the driver",
                constraint, ordinal
            );
            continue;
        }

        if !parts.contains_key(&constraint) {
            order.push(constraint.clone());
            targets.insert(
                constraint.clone(),
                TableRef {
                    catalog: row.get_string("ref_catalog").filter(|s| !s.is_empty()),
                    schema: row.get_string("ref_schema").filter(|s| !s.is_empty()),
                    name: row.get_string("ref_table").unwrap_or_default(),
                },
            );
        }
        parts.entry(constraint).or_default().push((
            ordinal,
            row.require_str("column_name")?.to_string(),
            row.get_string("ref_column").unwrap_or_default(),
        ));
    }

    let mut out = Vec::with_capacity(order.len());
    for constraint in order {
        let mut pairs = parts.remove(&constraint).unwrap_or_default();
        pairs.sort_by_key(|(ordinal, _, _)| *ordinal);
        let ref_table = targets.remove(&constraint).unwrap_or(TableRef {
            catalog: None,
            schema: None,
            name: String::new(),
        });
        out.push(ForeignKeyRecord {
            name: constraint,
            table: table.clone(),
            columns: pairs.iter().map(|(_, column, _)| column.clone()).collect(),
            ref_table,
            ref_columns: pairs.into_iter().map(|(_, _, ref_column)| ref_column).collect(),
        });
    }
    Ok(out)
}

/// Group index part rows into one record per index.
///
/// Uniqueness comes from either a `non_unique` flag or Oracle's `uniqueness`
/// text column. Rows without a column name (expression-based index parts)
/// are skipped.
pub(crate) fn fold_indexes(table: &TableRef, rows: &[MetaRow]) -> Result<Vec<IndexRecord>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (bool, Vec<(i64, String)>)> = HashMap::new();

    for row in rows {
        let Some(name) = row.get_string("index_name") else {
            continue;
        };
        let Some(column) = row.get_string("column_name") else {
            continue;
        };
        let unique = match row.get_bool("non_unique") {
            Some(non_unique) => !non_unique,
            None => row
                .get_str("uniqueness")
                .map(|u| u.eq_ignore_ascii_case("UNIQUE"))
                .unwrap_or(false),
        };
        let ordinal = row.get_i64("ordinal_position").unwrap_or(0);

        if !groups.contains_key(&name) {
            order.push(name.clone());
        }
        let entry = groups.entry(name).or_insert((unique, Vec::new()));
        entry.1.push((ordinal, column));
    }

    let mut out = Vec::with_capacity(order.len());
    for name in order {
        let (unique, mut columns) = groups.remove(&name).unwrap_or((false, Vec::new()));
        columns.sort_by_key(|(ordinal, _)| *ordinal);
        out.push(IndexRecord {
            table: table.clone(),
            name,
            unique,
            columns: columns.into_iter().map(|(_, column)| column).collect(),
        });
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::records::Nullability;

    use std::sync::Mutex;

    /// Mock connection: canned rows keyed by a SQL substring, plus a log of
    /// every issued statement.
    pub(crate) struct MockMetaQuery {
        responses: Vec<(&'static str, Vec<MetaRow>)>,
        pub issued: Mutex<Vec<(String, Vec<String>)>>,
        pub closed: Mutex<u32>,
    }

    impl MockMetaQuery {
        pub fn new(responses: Vec<(&'static str, Vec<MetaRow>)>) -> Self {
            Self {
                responses,
                issued: Mutex::new(Vec::new()),
                closed: Mutex::new(0),
            }
        }

        pub fn empty() -> Self {
            Self::new(Vec::new())
        }
    }

    #[async_trait]
    impl MetaQuery for MockMetaQuery {
        fn placeholder(&self, index: usize) -> String {
            format!("${}", index)
        }

        async fn query(&self, sql: &str, params: &[&str]) -> Result<crate::core::sequence::RowSequence> {
            self.issued.lock().unwrap().push((
                sql.to_string(),
                params.iter().map(|p| p.to_string()).collect(),
            ));
            let rows = self
                .responses
                .iter()
                .find(|(needle, _)| sql.contains(needle))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            Ok(crate::core::sequence::RowSequence::buffered(rows))
        }

        async fn close(&self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    fn table_row(schema: &str, name: &str, kind: &str) -> MetaRow {
        MetaRow::new()
            .with("table_catalog", "app")
            .with("table_schema", schema)
            .with("table_name", name)
            .with("table_type", kind)
    }

    #[tokio::test]
    async fn test_tables_pushes_filters_down() {
        let conn = Arc::new(MockMetaQuery::empty());
        let dialect = GenericMetaDataDialect::new(conn.clone());

        let filter = TableFilter {
            catalog: None,
            schema: Some("public".into()),
            table_pattern: Some("app_%".into()),
        };
        dialect.tables(&filter).await.unwrap().collect().await.unwrap();

        let issued = conn.issued.lock().unwrap();
        let (sql, params) = &issued[0];
        assert!(sql.contains("table_schema = $1"));
        assert!(sql.contains("table_name LIKE $2"));
        assert_eq!(params, &vec!["public".to_string(), "app_%".to_string()]);
    }

    #[tokio::test]
    async fn test_tables_maps_rows() {
        let conn = Arc::new(MockMetaQuery::new(vec![(
            "information_schema.tables",
            vec![
                table_row("public", "orders", "BASE TABLE"),
                table_row("public", "order_totals", "VIEW"),
            ],
        )]));
        let dialect = GenericMetaDataDialect::new(conn);

        let tables = dialect
            .tables(&TableFilter::default())
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "orders");
        assert_eq!(tables[0].kind, TableKind::Table);
        assert_eq!(tables[0].remarks, None);
        assert_eq!(tables[1].kind, TableKind::View);
    }

    #[tokio::test]
    async fn test_columns_mapping() {
        let conn = Arc::new(MockMetaQuery::new(vec![(
            "information_schema.columns",
            vec![
                MetaRow::new()
                    .with("column_name", "id")
                    .with("data_type", "bigint")
                    .with("character_maximum_length", crate::core::value::MetaValue::Null)
                    .with("numeric_precision", 64i64)
                    .with("is_nullable", "NO")
                    .with("ordinal_position", 1i64),
                MetaRow::new()
                    .with("column_name", "email")
                    .with("data_type", "character varying")
                    .with("character_maximum_length", 255i64)
                    .with("is_nullable", "YES")
                    .with("ordinal_position", 2i64)
                    .with("column_default", "'unknown'"),
            ],
        )]));
        let dialect = GenericMetaDataDialect::new(conn);

        let table = TableRef::new(None::<String>, Some("public"), "users");
        let columns = dialect.columns(&table).await.unwrap().collect().await.unwrap();

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].sql_type, SqlType::BigInt);
        assert_eq!(columns[0].nullable, Nullability::NotNull);
        assert_eq!(columns[0].column_size, Some(64));
        assert_eq!(columns[1].sql_type, SqlType::Varchar);
        assert_eq!(columns[1].column_size, Some(255));
        assert_eq!(columns[1].default_value.as_deref(), Some("'unknown'"));
    }

    #[tokio::test]
    async fn test_primary_key_folds_in_ordinal_order() {
        let conn = Arc::new(MockMetaQuery::new(vec![(
            "table_constraints",
            vec![
                MetaRow::new()
                    .with("constraint_name", "orders_pk")
                    .with("column_name", "line_no")
                    .with("ordinal_position", 2i64),
                MetaRow::new()
                    .with("constraint_name", "orders_pk")
                    .with("column_name", "order_id")
                    .with("ordinal_position", 1i64),
            ],
        )]));
        let dialect = GenericMetaDataDialect::new(conn);

        let table = TableRef::new(None::<String>, Some("public"), "order_lines");
        let keys = dialect.primary_keys(&table).await.unwrap().collect().await.unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name.as_deref(), Some("orders_pk"));
        assert_eq!(keys[0].columns, vec!["order_id", "line_no"]);
    }

    #[tokio::test]
    async fn test_primary_key_empty_when_absent() {
        let conn = Arc::new(MockMetaQuery::empty());
        let dialect = GenericMetaDataDialect::new(conn);
        let table = TableRef::new(None::<String>, Some("public"), "logs");
        let keys = dialect.primary_keys(&table).await.unwrap().collect().await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_keys_dedup_and_pairing() {
        let part = |constraint: &str, ordinal: i64, column: &str, ref_column: &str| {
            MetaRow::new()
                .with("constraint_name", constraint)
                .with("column_name", column)
                .with("ordinal_position", ordinal)
                .with("ref_schema", "billing")
                .with("ref_table", "invoices")
                .with("ref_column", ref_column)
        };
        let conn = Arc::new(MockMetaQuery::new(vec![(
            "referential_constraints",
            vec![
                part("fk_invoice", 1, "invoice_no", "no"),
                part("fk_invoice", 2, "invoice_year", "year"),
                // duplicate row for a composite key, as some drivers produce
                part("fk_invoice", 2, "invoice_year", "year"),
            ],
        )]));
        let dialect = GenericMetaDataDialect::new(conn);

        let table = TableRef::new(None::<String>, Some("public"), "payments");
        let fks = dialect.foreign_keys(&table).await.unwrap().collect().await.unwrap();

        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].columns, vec!["invoice_no", "invoice_year"]);
        assert_eq!(fks[0].ref_columns, vec!["no", "year"]);
        assert_eq!(fks[0].ref_table.schema.as_deref(), Some("billing"));
        assert_eq!(fks[0].ref_table.name, "invoices");
    }

    #[tokio::test]
    async fn test_indexes_unsupported() {
        let conn = Arc::new(MockMetaQuery::empty());
        let dialect = GenericMetaDataDialect::new(conn);
        let table = TableRef::new(None::<String>, Some("public"), "orders");
        let err = dialect.indexes(&table).await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_case_folding_applies_to_filters() {
        let conn = Arc::new(MockMetaQuery::empty());
        let dialect = GenericMetaDataDialect::with_case(conn.clone(), IdentCase::Upper);

        let table = TableRef::new(None::<String>, Some("Public"), "Orders");
        dialect.columns(&table).await.unwrap().collect().await.unwrap();

        let issued = conn.issued.lock().unwrap();
        let (_, params) = &issued[0];
        assert_eq!(params, &vec!["PUBLIC".to_string(), "ORDERS".to_string()]);
    }

    #[tokio::test]
    async fn test_close_delegates_to_connection() {
        let conn = Arc::new(MockMetaQuery::empty());
        let dialect = GenericMetaDataDialect::new(conn.clone());
        dialect.close().await;
        dialect.close().await;
        assert_eq!(*conn.closed.lock().unwrap(), 2);
    }

    #[test]
    fn test_fold_indexes_groups_and_skips_expression_parts() {
        let table = TableRef::new(None::<String>, Some("public"), "orders");
        let rows = vec![
            MetaRow::new()
                .with("index_name", "idx_status")
                .with("non_unique", true)
                .with("ordinal_position", 1i64)
                .with("column_name", "status"),
            MetaRow::new()
                .with("index_name", "uq_number")
                .with("non_unique", false)
                .with("ordinal_position", 2i64)
                .with("column_name", "year"),
            MetaRow::new()
                .with("index_name", "uq_number")
                .with("non_unique", false)
                .with("ordinal_position", 1i64)
                .with("column_name", "number"),
            // expression part without a column name
            MetaRow::new()
                .with("index_name", "idx_expr")
                .with("non_unique", true)
                .with("ordinal_position", 1i64),
        ];
        let indexes = fold_indexes(&table, &rows).unwrap();
        assert_eq!(indexes.len(), 2);
        assert!(!indexes[0].unique);
        assert!(indexes[1].unique);
        assert_eq!(indexes[1].columns, vec!["number", "year"]);
    }
}
