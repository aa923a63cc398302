//! Oracle metadata dialect.
//!
//! Oracle ships no `information_schema`, so every enumeration is overridden
//! to query the `ALL_*` data dictionary views. Tables carry their comments
//! from `ALL_TAB_COMMENTS` (the standard facility never populates them), and
//! foreign-key targets resolve through `R_CONSTRAINT_NAME`, which reaches
//! referenced tables outside the scanned schema.
//!
//! Oracle stores unquoted identifiers in upper case; all caller-supplied
//! filters are folded accordingly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, PrimaryKeyRecord, TableRecord, TableRef,
};
use crate::core::sequence::RecordSequence;
use crate::core::traits::{MetaDataDialect, MetaQuery, TableFilter};
use crate::error::Result;

use super::generic::{
    and_filter, column_from_row, fold_foreign_keys, fold_indexes, fold_primary_key, param_refs,
    table_from_row, GenericMetaDataDialect, IdentCase,
};

pub struct OracleMetaDataDialect {
    inner: GenericMetaDataDialect,
    conn: Arc<dyn MetaQuery>,
}

impl OracleMetaDataDialect {
    pub fn new(conn: Arc<dyn MetaQuery>) -> Self {
        Self {
            inner: GenericMetaDataDialect::with_case(conn.clone(), IdentCase::Upper),
            conn,
        }
    }

    /// Oracle addresses tables by owner only; the caller's two-level filter
    /// collapses onto it, schema taking precedence over catalog.
    fn owner_filter<'a>(&self, filter: &'a TableFilter) -> Option<&'a str> {
        filter.namespace()
    }
}

#[async_trait]
impl MetaDataDialect for OracleMetaDataDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn normalize_ident(&self, name: &str) -> String {
        name.to_uppercase()
    }

    async fn tables(&self, filter: &TableFilter) -> Result<RecordSequence<TableRecord>> {
        let mut sql = String::from(
            "SELECT t.owner AS table_schema, t.table_name, 'TABLE' AS table_type, \
                    c.comments AS remarks \
             FROM all_tables t \
             LEFT JOIN all_tab_comments c \
               ON c.owner = t.owner AND c.table_name = t.table_name \
             WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(owner) = self.owner_filter(filter) {
            and_filter(&*self.conn, &mut sql, &mut params, "t.owner", "=", &self.normalize_ident(owner));
        }
        if let Some(pattern) = &filter.table_pattern {
            and_filter(&*self.conn, &mut sql, &mut params, "t.table_name", "LIKE", &self.normalize_ident(pattern));
        }
        sql.push_str(
            " UNION ALL \
             SELECT v.owner, v.view_name, 'VIEW', c.comments \
             FROM all_views v \
             LEFT JOIN all_tab_comments c \
               ON c.owner = v.owner AND c.table_name = v.view_name \
             WHERE 1 = 1",
        );
        if let Some(owner) = self.owner_filter(filter) {
            and_filter(&*self.conn, &mut sql, &mut params, "v.owner", "=", &self.normalize_ident(owner));
        }
        if let Some(pattern) = &filter.table_pattern {
            and_filter(&*self.conn, &mut sql, &mut params, "v.view_name", "LIKE", &self.normalize_ident(pattern));
        }
        sql.push_str(" ORDER BY 1, 2");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?;
        Ok(RecordSequence::mapped(rows, table_from_row))
    }

    async fn columns(&self, table: &TableRef) -> Result<RecordSequence<ColumnRecord>> {
        let mut sql = String::from(
            "SELECT column_name, data_type, \
                    char_length AS character_maximum_length, \
                    data_precision AS numeric_precision, \
                    data_scale AS numeric_scale, \
                    nullable AS is_nullable, \
                    column_id AS ordinal_position, \
                    data_default AS column_default \
             FROM all_tab_columns WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(owner) = table.schema.as_deref().or(table.catalog.as_deref()) {
            and_filter(&*self.conn, &mut sql, &mut params, "owner", "=", &self.normalize_ident(owner));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "table_name", "=", &self.normalize_ident(&table.name));
        sql.push_str(" ORDER BY column_id");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?;
        Ok(RecordSequence::mapped(rows, column_from_row))
    }

    async fn primary_keys(&self, table: &TableRef) -> Result<RecordSequence<PrimaryKeyRecord>> {
        let mut sql = String::from(
            "SELECT c.constraint_name, cc.column_name, cc.position AS ordinal_position \
             FROM all_constraints c \
             JOIN all_cons_columns cc \
               ON cc.owner = c.owner AND cc.constraint_name = c.constraint_name \
             WHERE c.constraint_type = 'P'",
        );
        let mut params = Vec::new();
        if let Some(owner) = table.schema.as_deref().or(table.catalog.as_deref()) {
            and_filter(&*self.conn, &mut sql, &mut params, "c.owner", "=", &self.normalize_ident(owner));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "c.table_name", "=", &self.normalize_ident(&table.name));
        sql.push_str(" ORDER BY cc.position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(
            fold_primary_key(table, &rows)?.into_iter().collect(),
        ))
    }

    async fn foreign_keys(&self, table: &TableRef) -> Result<RecordSequence<ForeignKeyRecord>> {
        let mut sql = String::from(
            "SELECT c.constraint_name, cc.column_name, cc.position AS ordinal_position, \
                    rc.owner AS ref_schema, rc.table_name AS ref_table, \
                    rcc.column_name AS ref_column \
             FROM all_constraints c \
             JOIN all_cons_columns cc \
               ON cc.owner = c.owner AND cc.constraint_name = c.constraint_name \
             JOIN all_constraints rc \
               ON rc.owner = c.r_owner AND rc.constraint_name = c.r_constraint_name \
             JOIN all_cons_columns rcc \
               ON rcc.owner = rc.owner AND rcc.constraint_name = rc.constraint_name \
              AND rcc.position = cc.position \
             WHERE c.constraint_type = 'R'",
        );
        let mut params = Vec::new();
        if let Some(owner) = table.schema.as_deref().or(table.catalog.as_deref()) {
            and_filter(&*self.conn, &mut sql, &mut params, "c.owner", "=", &self.normalize_ident(owner));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "c.table_name", "=", &self.normalize_ident(&table.name));
        sql.push_str(" ORDER BY c.constraint_name, cc.position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(fold_foreign_keys(table, &rows)?))
    }

    async fn indexes(&self, table: &TableRef) -> Result<RecordSequence<IndexRecord>> {
        let mut sql = String::from(
            "SELECT i.index_name, i.uniqueness, ic.column_position AS ordinal_position, \
                    ic.column_name \
             FROM all_indexes i \
             JOIN all_ind_columns ic \
               ON ic.index_owner = i.owner AND ic.index_name = i.index_name \
             WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(owner) = table.schema.as_deref().or(table.catalog.as_deref()) {
            and_filter(&*self.conn, &mut sql, &mut params, "i.table_owner", "=", &self.normalize_ident(owner));
        }
        and_filter(&*self.conn, &mut sql, &mut params, "i.table_name", "=", &self.normalize_ident(&table.name));
        sql.push_str(" ORDER BY i.index_name, ic.column_position");

        let rows = self.conn.query(&sql, &param_refs(&params)).await?.collect().await?;
        Ok(RecordSequence::ready(fold_indexes(table, &rows)?))
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
