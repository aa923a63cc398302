//! H2 metadata dialect.
//!
//! H2's `information_schema` is close to the standard, so columns, primary
//! keys, and foreign keys inherit the generic behavior. Overridden:
//!
//! - `tables`: H2 carries a `REMARKS` column the standard enumeration never
//!   selects
//! - `indexes`: `INFORMATION_SCHEMA.INDEXES` is an H2 extension
//!
//! H2 stores unquoted identifiers in upper case; filters fold accordingly,
//! including those flowing through the inherited operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, PrimaryKeyRecord, TableRecord, TableRef,
};
use crate::core::sequence::RecordSequence;
use crate::core::traits::{MetaDataDialect, MetaQuery, TableFilter};
use crate::error::Result;

use super::generic::{
    and_filter, fold_indexes, param_refs, table_from_row, GenericMetaDataDialect, IdentCase,
};

pub struct H2MetaDataDialect {
    inner: GenericMetaDataDialect,
    conn: Arc<dyn MetaQuery>,
}

impl H2MetaDataDialect {
    pub fn new(conn: Arc<dyn MetaQuery>) -> Self {
        Self {
            inner: GenericMetaDataDialect::with_case(conn.clone(), IdentCase::Upper),
            conn,
        }
    }
}

#[async_trait]
impl MetaDataDialect for H2MetaDataDialect {
    fn name(&self) -> &str {
        "h2"
    }

    fn normalize_ident(&self, name: &str) -> String {
        name.to_uppercase()
    }

    async fn tables(&self, filter: &TableFilter) -> Result<RecordSequence<TableRecord>> {
        let mut sql = String::from(
            "SELECT table_catalog, table_schema, table_name, table_type, remarks \
             FROM information_schema.tables \
             WHERE table_type IN ('BASE TABLE', 'TABLE', 'VIEW')",
        );
        let mut params = Vec::new();
        if let Some(catalog) = &filter.catalog {
            and_filter(&*self.conn, &mut sql, &mut params, "table_catalog", "=", &self.normalize_ident(catalog));
        }
        if let Some(schema) = &filter.schema {
            and_filter(&*self.conn, &mut sql, &mut params, "table_schema", "=", &self.normalize_ident(schema));
        }
        if let Some(pattern) = &filter.table_pattern {
            and_filter(&*self.conn, &mut sql, &mut params, "table_name", "LIKE", &self.normalize_ident(pattern));
        }
        sql.push_str(" ORDER BY table_schema, table_name");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?;
        Ok(RecordSequence::mapped(rows, table_from_row))
    }

    async fn columns(&self, table: &TableRef) -> Result<RecordSequence<ColumnRecord>> {
        self.inner.columns(table).await
    }

    async fn primary_keys(&self, table: &TableRef) -> Result<RecordSequence<PrimaryKeyRecord>> {
        self.inner.primary_keys(table).await
    }

    async fn foreign_keys(&self, table: &TableRef) -> Result<RecordSequence<ForeignKeyRecord>> {
        self.inner.foreign_keys(table).await
    }

    async fn indexes(&self, table: &TableRef) -> Result<RecordSequence<IndexRecord>> {
        let mut sql = String::from(
            "SELECT index_name, non_unique, ordinal_position, column_name \
             FROM information_schema.indexes WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(schema) = &table.schema {
            and_filter(&*self.conn, &mut sql, &mut params, "table_schema", "=", &self.normalize_ident(schema));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "table_name", "=", &self.normalize_ident(&table.name));
        sql.push_str(" ORDER BY index_name, ordinal_position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(fold_indexes(table, &rows)?))
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
