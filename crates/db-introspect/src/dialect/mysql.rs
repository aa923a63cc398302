//! MySQL/MariaDB metadata dialect.
//!
//! MySQL exposes a single namespace level: the database, surfaced as
//! `TABLE_SCHEMA` in its `information_schema`. The caller's two-level
//! catalog/schema filter collapses onto it without duplicating entries.
//!
//! Overridden operations:
//! - `tables`: backfills remarks from `TABLE_COMMENT`, which the standard
//!   enumeration never populates
//! - `foreign_keys`: reads `KEY_COLUMN_USAGE`'s `REFERENCED_*` columns,
//!   which resolve targets in other databases and need (constraint,
//!   ordinal) de-duplication for composite keys
//! - `indexes`: reads `INFORMATION_SCHEMA.STATISTICS`
//!
//! Columns and primary keys inherit the generic behavior unmodified.
//!
//! Identifier case is left untouched: table-name comparison depends on the
//! host filesystem (`lower_case_table_names`), and folding here would break
//! lookups on case-sensitive hosts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, PrimaryKeyRecord, TableRecord, TableRef,
};
use crate::core::sequence::RecordSequence;
use crate::core::traits::{MetaDataDialect, MetaQuery, TableFilter};
use crate::error::Result;

use super::generic::{
    and_filter, fold_foreign_keys, fold_indexes, param_refs, table_from_row,
    GenericMetaDataDialect,
};

pub struct MySqlMetaDataDialect {
    inner: GenericMetaDataDialect,
    conn: Arc<dyn MetaQuery>,
}

impl MySqlMetaDataDialect {
    pub fn new(conn: Arc<dyn MetaQuery>) -> Self {
        Self {
            inner: GenericMetaDataDialect::new(conn.clone()),
            conn,
        }
    }
}

#[async_trait]
impl MetaDataDialect for MySqlMetaDataDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn tables(&self, filter: &TableFilter) -> Result<RecordSequence<TableRecord>> {
        let mut sql = String::from(
            "SELECT table_schema, table_name, table_type, table_comment AS remarks \
             FROM information_schema.tables \
             WHERE table_type IN ('BASE TABLE', 'VIEW')",
        );
        let mut params = Vec::new();
        if let Some(database) = filter.namespace() {
            and_filter(&*self.conn, &mut sql, &mut params, "table_schema", "=", database);
        }
        if let Some(pattern) = &filter.table_pattern {
            and_filter(&*self.conn, &mut sql, &mut params, "table_name", "LIKE", pattern);
        }
        sql.push_str(" ORDER BY table_schema, table_name");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?;
        Ok(RecordSequence::mapped(rows, table_from_row))
    }

    async fn columns(&self, table: &TableRef) -> Result<RecordSequence<ColumnRecord>> {
        self.inner.columns(&conflate(table)).await
    }

    async fn primary_keys(&self, table: &TableRef) -> Result<RecordSequence<PrimaryKeyRecord>> {
        self.inner.primary_keys(&conflate(table)).await
    }

    async fn foreign_keys(&self, table: &TableRef) -> Result<RecordSequence<ForeignKeyRecord>> {
        let mut sql = String::from(
            "SELECT constraint_name, column_name, ordinal_position, \
                    referenced_table_schema AS ref_schema, \
                    referenced_table_name AS ref_table, \
                    referenced_column_name AS ref_column \
             FROM information_schema.key_column_usage \
             WHERE referenced_table_name IS NOT NULL",
        );
        let mut params = Vec::new();
        if let Some(database) = table.schema.as_deref().or(table.catalog.as_deref()) {
            and_filter(&*self.conn, &mut sql, &mut params, "table_schema", "=", database);
        }
        and_filter(&*self.conn, &mut sql, &mut params, "table_name", "=", &table.name);
        sql.push_str(" ORDER BY constraint_name, ordinal_position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(fold_foreign_keys(table, &rows)?))
    }

    async fn indexes(&self, table: &TableRef) -> Result<RecordSequence<IndexRecord>> {
        let mut sql = String::from(
            "SELECT index_name, non_unique, seq_in_index AS ordinal_position, column_name \
             FROM information_schema.statistics WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(database) = table.schema.as_deref().or(table.catalog.as_deref()) {
            and_filter(&*self.conn, &mut sql, &mut params, "table_schema", "=", database);
        }
        and_filter(&*self.conn, &mut sql, &mut params, "table_name", "=", &table.name);
        sql.push_str(" ORDER BY index_name, seq_in_index");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(fold_indexes(table, &rows)?))
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

/// Collapse a two-level ref onto MySQL's single namespace: whichever of
/// schema/catalog is present becomes the schema, catalog is dropped.
fn conflate(table: &TableRef) -> TableRef {
    TableRef {
        catalog: None,
        schema: table
            .schema
            .clone()
            .or_else(|| table.catalog.clone()),
        name: table.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::MetaRow;
    use crate::dialect::generic::tests::MockMetaQuery;

    #[tokio::test]
    async fn test_catalog_filter_maps_onto_database() {
        let conn = Arc::new(MockMetaQuery::empty());
        let dialect = MySqlMetaDataDialect::new(conn.clone());

        // caller supplied only a catalog; it must land on table_schema
        let filter = TableFilter {
            catalog: Some("app".into()),
            schema: None,
            table_pattern: None,
        };
        dialect.tables(&filter).await.unwrap().collect().await.unwrap();

        let issued = conn.issued.lock().unwrap();
        let (sql, params) = &issued[0];
        assert!(sql.contains("table_schema = $1"));
        assert!(!sql.contains("table_catalog"));
        assert_eq!(params, &vec!["app".to_string()]);
    }

    #[tokio::test]
    async fn test_tables_carry_comments() {
        let conn = Arc::new(MockMetaQuery::new(vec![(
            "table_comment",
            vec![MetaRow::new()
                .with("table_schema", "app")
                .with("table_name", "orders")
                .with("table_type", "BASE TABLE")
                .with("remarks", "Customer orders")],
        )]));
        let dialect = MySqlMetaDataDialect::new(conn);

        let tables = dialect
            .tables(&TableFilter::default())
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(tables[0].remarks.as_deref(), Some("Customer orders"));
        assert_eq!(tables[0].catalog, None);
    }

    #[tokio::test]
    async fn test_foreign_keys_from_referenced_columns() {
        let conn = Arc::new(MockMetaQuery::new(vec![(
            "referenced_table_name",
            vec![
                MetaRow::new()
                    .with("constraint_name", "fk_customer")
                    .with("column_name", "customer_id")
                    .with("ordinal_position", 1i64)
                    .with("ref_schema", "crm")
                    .with("ref_table", "customers")
                    .with("ref_column", "id"),
                // duplicate row as returned for composite keys on some versions
                MetaRow::new()
                    .with("constraint_name", "fk_customer")
                    .with("column_name", "customer_id")
                    .with("ordinal_position", 1i64)
                    .with("ref_schema", "crm")
                    .with("ref_table", "customers")
                    .with("ref_column", "id"),
            ],
        )]));
        let dialect = MySqlMetaDataDialect::new(conn);

        let table = TableRef::new(None::<String>, Some("app"), "orders");
        let fks = dialect.foreign_keys(&table).await.unwrap().collect().await.unwrap();

        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].columns, vec!["customer_id"]);
        // cross-database target preserved
        assert_eq!(fks[0].ref_table.schema.as_deref(), Some("crm"));
    }

    #[tokio::test]
    async fn test_indexes_from_statistics() {
        let conn = Arc::new(MockMetaQuery::new(vec![(
            "information_schema.statistics",
            vec![
                MetaRow::new()
                    .with("index_name", "PRIMARY")
                    .with("non_unique", 0i64)
                    .with("ordinal_position", 1i64)
                    .with("column_name", "id"),
                MetaRow::new()
                    .with("index_name", "idx_created")
                    .with("non_unique", 1i64)
                    .with("ordinal_position", 1i64)
                    .with("column_name", "created_at"),
            ],
        )]));
        let dialect = MySqlMetaDataDialect::new(conn);

        let table = TableRef::new(None::<String>, Some("app"), "orders");
        let indexes = dialect.indexes(&table).await.unwrap().collect().await.unwrap();

        assert_eq!(indexes.len(), 2);
        assert!(indexes[0].unique);
        assert!(!indexes[1].unique);
    }

    #[tokio::test]
    async fn test_columns_inherit_generic() {
        let conn = Arc::new(MockMetaQuery::empty());
        let dialect = MySqlMetaDataDialect::new(conn.clone());

        let table = TableRef::new(Some("app"), None::<String>, "orders");
        dialect.columns(&table).await.unwrap().collect().await.unwrap();

        let issued = conn.issued.lock().unwrap();
        let (sql, params) = &issued[0];
        // generic information_schema.columns query with the catalog collapsed
        // onto table_schema
        assert!(sql.contains("information_schema.columns"));
        assert!(sql.contains("table_schema = $1"));
        assert_eq!(params, &vec!["app".to_string(), "orders".to_string()]);
    }
}
