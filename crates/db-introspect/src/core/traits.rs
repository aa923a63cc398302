//! Core traits for engine-agnostic schema introspection.
//!
//! This module defines the two seams of the crate:
//!
//! - [`MetaQuery`]: the connection port a driver adapter implements
//! - [`MetaDataDialect`]: the per-engine metadata extraction strategy
//!
//! # Design
//!
//! Callers never branch on engine type: the
//! [`MetaDialectFactory`](crate::dialect::MetaDialectFactory) resolves one
//! [`MetaDataDialect`] per extraction run, and the dialect compensates for
//! the engine's metadata quirks internally. Specialized dialects hold the
//! generic implementation and delegate every operation they do not override.

use async_trait::async_trait;

use crate::core::records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, PrimaryKeyRecord, TableRecord, TableRef,
};
use crate::core::sequence::{RecordSequence, RowSequence};
use crate::error::Result;

/// Filter for the table enumeration operation.
///
/// `catalog` and `schema` match exactly (after engine case folding);
/// `table_pattern` uses SQL `LIKE` semantics and is pushed down into the
/// catalog query so the engine does the narrowing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableFilter {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table_pattern: Option<String>,
}

impl TableFilter {
    /// The single namespace value for engines that address tables through
    /// one level only. Schema wins when the caller supplied both.
    pub fn namespace(&self) -> Option<&str> {
        self.schema.as_deref().or(self.catalog.as_deref())
    }
}

/// Execute metadata queries against a live connection.
///
/// This is the port driver adapters implement. Dialects build engine
/// catalog SQL with [`placeholder`](Self::placeholder)-style parameters and
/// receive rows in the driver-neutral [`MetaRow`](crate::core::value::MetaRow)
/// shape.
///
/// Metadata cursors on a single connection are not safe for concurrent use;
/// callers evaluate one query's sequence to completion (or drop it) before
/// issuing the next.
#[async_trait]
pub trait MetaQuery: Send + Sync {
    /// Parameter placeholder for the given 1-based index.
    ///
    /// - PostgreSQL: `$1`, `$2`, ...
    /// - MySQL: `?`
    /// - SQL Server: `@P1`, `@P2`, ...
    fn placeholder(&self, index: usize) -> String;

    /// Run a query, binding string parameters positionally, and return a
    /// lazy sequence of rows.
    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowSequence>;

    /// Release the underlying connection resources. Idempotent, and safe to
    /// call after a failed extraction.
    async fn close(&self);
}

/// Extract schema metadata from a live connection, compensating for the
/// engine's quirks.
///
/// Every enumeration returns a lazy, finite, non-restartable sequence and
/// may fail with an extraction error if the underlying query fails. An
/// operation the engine genuinely cannot answer fails with
/// [`IntrospectError::Unsupported`](crate::error::IntrospectError::Unsupported),
/// which the pipeline degrades to an empty sequence.
#[async_trait]
pub trait MetaDataDialect: Send + Sync {
    /// Dialect identifier (e.g. "oracle", "generic").
    fn name(&self) -> &str;

    /// Fold a caller-supplied identifier to the case the engine stores
    /// unquoted identifiers in. Mixed-case filters would otherwise silently
    /// match nothing on folding engines.
    fn normalize_ident(&self, name: &str) -> String {
        name.to_string()
    }

    /// Enumerate tables and views matching the filter.
    async fn tables(&self, filter: &TableFilter) -> Result<RecordSequence<TableRecord>>;

    /// Enumerate the columns of one table, in ordinal order.
    async fn columns(&self, table: &TableRef) -> Result<RecordSequence<ColumnRecord>>;

    /// The table's primary key: at most one record, possibly multi-column.
    /// Empty sequence when the table has no primary key.
    async fn primary_keys(&self, table: &TableRef) -> Result<RecordSequence<PrimaryKeyRecord>>;

    /// The table's outbound referential constraints, one record per
    /// constraint with columns paired positionally.
    async fn foreign_keys(&self, table: &TableRef) -> Result<RecordSequence<ForeignKeyRecord>>;

    /// The table's indexes.
    async fn indexes(&self, table: &TableRef) -> Result<RecordSequence<IndexRecord>>;

    /// Release auxiliary resources opened by the dialect. Idempotent.
    async fn close(&self);
}
