//! Extraction pipeline.
//!
//! Drives a resolved [`MetaDataDialect`] through the selected namespaces and
//! yields one fully-populated [`TableAggregate`] per table, lazily, in the
//! dialect's own traversal order. Include/exclude filters are applied before
//! any per-table detail query is issued, which bounds the cost of a run on
//! very large schemas.
//!
//! A failure while loading one table's detail aborts the whole run with
//! catalog/schema/table context; a half-built model silently missing a
//! primary key is worse for a generator than an explicit failure. The one
//! exception is the engine reporting a metadata class as unsupported, which
//! degrades that collection to empty.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::core::filter::NameFilter;
use crate::core::records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, PrimaryKeyRecord, TableRecord,
};
use crate::core::sequence::RecordSequence;
use crate::core::traits::{MetaDataDialect, TableFilter};
use crate::error::{IntrospectError, Result};

/// One table with all of its detail metadata, fully populated before it is
/// yielded.
///
/// Foreign-key targets that were not themselves selected by the filters are
/// present as identity only ([`ForeignKeyRecord::ref_table`]); the pipeline
/// never widens the extraction scope transitively.
#[derive(Debug, Clone, PartialEq)]
pub struct TableAggregate {
    pub table: TableRecord,
    pub columns: Vec<ColumnRecord>,
    pub primary_key: Option<PrimaryKeyRecord>,
    pub foreign_keys: Vec<ForeignKeyRecord>,
    pub indexes: Vec<IndexRecord>,
}

impl TableAggregate {
    pub fn qualified_name(&self) -> String {
        self.table.qualified_name()
    }
}

/// Configures and starts one extraction run over a resolved dialect.
pub struct SchemaExtractor {
    dialect: Box<dyn MetaDataDialect>,
    config: ExtractionConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl SchemaExtractor {
    pub fn new(dialect: Box<dyn MetaDataDialect>, config: ExtractionConfig) -> Self {
        Self {
            dialect,
            config,
            cancel: None,
        }
    }

    /// Attach a cooperative cancellation signal. The flag is checked between
    /// tables, never mid-query, since metadata cursors cannot generally be
    /// interrupted safely.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Enumerate the selected tables and return the lazy aggregate sequence.
    pub async fn run(self) -> Result<TableAggregates> {
        let filter = TableFilter {
            catalog: self.config.catalog.clone(),
            schema: self.config.schema.clone(),
            table_pattern: self.config.table_pattern.clone(),
        };

        info!(
            "starting schema extraction with the {} metadata dialect",
            self.dialect.name()
        );

        let tables = self
            .dialect
            .tables(&filter)
            .await
            .map_err(|e| enumeration_error(&filter, e))?;

        Ok(TableAggregates {
            dialect: self.dialect,
            tables,
            schemas: NameFilter::new(
                self.config.include_schemas.clone(),
                self.config.exclude_schemas.clone(),
            ),
            names: NameFilter::new(
                self.config.include_tables.clone(),
                self.config.exclude_tables.clone(),
            ),
            cancel: self.cancel,
            done: false,
        })
    }
}

/// Lazy, fused sequence of assembled table aggregates.
///
/// Yields aggregates in the dialect's traversal order. After an error the
/// sequence stays terminated; partial results are never resumed.
pub struct TableAggregates {
    dialect: Box<dyn MetaDataDialect>,
    tables: RecordSequence<TableRecord>,
    schemas: NameFilter,
    names: NameFilter,
    cancel: Option<watch::Receiver<bool>>,
    done: bool,
}

impl TableAggregates {
    /// Produce the next aggregate, `Ok(None)` once exhausted.
    pub async fn try_next(&mut self) -> Result<Option<TableAggregate>> {
        if self.done {
            return Ok(None);
        }
        loop {
            if self.cancelled() {
                self.done = true;
                return Err(IntrospectError::Cancelled);
            }

            let record = match self.tables.next().await {
                None => {
                    self.done = true;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Err(IntrospectError::extraction(
                        "table enumeration",
                        e.to_string(),
                    ));
                }
                Some(Ok(record)) => record,
            };

            if !self.selected(&record) {
                debug!("skipping {} (filtered out)", record.qualified_name());
                continue;
            }

            match self.assemble(record).await {
                Ok(aggregate) => return Ok(Some(aggregate)),
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            }
        }
    }

    /// Materialize the remainder of the run.
    pub async fn collect(mut self) -> Result<Vec<TableAggregate>> {
        let mut out = Vec::new();
        while let Some(aggregate) = self.try_next().await? {
            out.push(aggregate);
        }
        Ok(out)
    }

    /// Release the dialect and its connection resources.
    pub async fn close(self) {
        self.dialect.close().await;
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    fn selected(&self, table: &TableRecord) -> bool {
        let namespace = table
            .schema
            .as_deref()
            .or(table.catalog.as_deref())
            .unwrap_or("");
        self.schemas.accepts(namespace) && self.names.accepts(&table.name)
    }

    async fn assemble(&mut self, table: TableRecord) -> Result<TableAggregate> {
        let table_ref = table.table_ref();
        let context = table_ref.qualified_name();

        let columns = collect_detail(self.dialect.columns(&table_ref).await, &context, "column").await?;
        let columns = normalize_ordinals(columns, &context);

        let primary_key =
            collect_detail(self.dialect.primary_keys(&table_ref).await, &context, "primary key")
                .await?
                .into_iter()
                .next();

        let foreign_keys =
            collect_detail(self.dialect.foreign_keys(&table_ref).await, &context, "foreign key")
                .await?;

        let indexes =
            collect_detail(self.dialect.indexes(&table_ref).await, &context, "index").await?;

        debug!(
            "assembled {}: {} columns, pk {}, {} foreign keys, {} indexes",
            context,
            columns.len(),
            if primary_key.is_some() { "present" } else { "absent" },
            foreign_keys.len(),
            indexes.len()
        );

        Ok(TableAggregate {
            table,
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }
}

/// Collect one detail sequence, degrading `Unsupported` to empty and
/// wrapping real failures with the table context.
async fn collect_detail<T>(
    opened: Result<RecordSequence<T>>,
    context: &str,
    what: &'static str,
) -> Result<Vec<T>> {
    let sequence = match opened {
        Ok(sequence) => sequence,
        Err(e) if e.is_unsupported() => {
            warn!("{}: {} metadata unavailable on this engine, continuing without it", context, what);
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(IntrospectError::extraction(
                context,
                format!("loading {} metadata: {}", what, e),
            ));
        }
    };

    match sequence.collect().await {
        Ok(records) => Ok(records),
        Err(e) if e.is_unsupported() => {
            warn!("{}: {} metadata unavailable on this engine, continuing without it", context, what);
            Ok(Vec::new())
        }
        Err(e) => Err(IntrospectError::extraction(
            context,
            format!("loading {} metadata: {}", what, e),
        )),
    }
}

/// Sort by the reported ordinal and renumber to the contiguous 1..n sequence
/// the record model guarantees. Engines report gaps after column drops.
fn normalize_ordinals(mut columns: Vec<ColumnRecord>, context: &str) -> Vec<ColumnRecord> {
    columns.sort_by_key(|c| c.ordinal);
    let mut renumbered = false;
    for (i, column) in columns.iter_mut().enumerate() {
        let expected = (i + 1) as u32;
        if column.ordinal != expected {
            column.ordinal = expected;
            renumbered = true;
        }
    }
    if renumbered {
        debug!("{}: column ordinals renumbered to a contiguous sequence", context);
    }
    columns
}

fn enumeration_error(filter: &TableFilter, e: IntrospectError) -> IntrospectError {
    let scope = filter.namespace().unwrap_or("default namespace");
    IntrospectError::extraction(scope, format!("enumerating tables: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::core::records::{Nullability, SqlType, TableKind, TableRef};

    /// Scripted dialect: a fixed table list with per-table detail, plus a
    /// call log for asserting what the pipeline touched.
    struct MockDialect {
        tables: Vec<TableRecord>,
        fail_columns_for: Option<String>,
        unsupported_indexes: bool,
        calls: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<u32>>,
    }

    impl MockDialect {
        fn new(tables: Vec<TableRecord>) -> Self {
            Self {
                tables,
                fail_columns_for: None,
                unsupported_indexes: false,
                calls: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(0)),
            }
        }

        fn log(&self, op: &str, name: &str) {
            self.calls.lock().unwrap().push(format!("{}:{}", op, name));
        }
    }

    fn table(schema: &str, name: &str) -> TableRecord {
        TableRecord {
            catalog: None,
            schema: Some(schema.to_string()),
            name: name.to_string(),
            kind: TableKind::Table,
            remarks: None,
        }
    }

    fn column(name: &str, ordinal: u32) -> ColumnRecord {
        ColumnRecord {
            name: name.to_string(),
            sql_type: SqlType::Integer,
            type_name: "integer".to_string(),
            column_size: None,
            decimal_digits: None,
            nullable: Nullability::Nullable,
            ordinal,
            default_value: None,
        }
    }

    #[async_trait]
    impl MetaDataDialect for MockDialect {
        fn name(&self) -> &str {
            "mock"
        }

        async fn tables(&self, _filter: &TableFilter) -> Result<RecordSequence<TableRecord>> {
            self.log("tables", "*");
            Ok(RecordSequence::ready(self.tables.clone()))
        }

        async fn columns(&self, table: &TableRef) -> Result<RecordSequence<ColumnRecord>> {
            self.log("columns", &table.name);
            if self.fail_columns_for.as_deref() == Some(table.name.as_str()) {
                return Err(IntrospectError::extraction(
                    table.qualified_name(),
                    "boom",
                ));
            }
            // deliberately gapped ordinals, as engines report after drops
            Ok(RecordSequence::ready(vec![
                column("b", 5),
                column("a", 2),
            ]))
        }

        async fn primary_keys(
            &self,
            table: &TableRef,
        ) -> Result<RecordSequence<PrimaryKeyRecord>> {
            self.log("primary_keys", &table.name);
            Ok(RecordSequence::ready(vec![PrimaryKeyRecord {
                table: table.clone(),
                name: Some(format!("{}_pk", table.name)),
                columns: vec!["a".to_string()],
            }]))
        }

        async fn foreign_keys(
            &self,
            table: &TableRef,
        ) -> Result<RecordSequence<ForeignKeyRecord>> {
            self.log("foreign_keys", &table.name);
            // references a table outside any filter selection
            Ok(RecordSequence::ready(vec![ForeignKeyRecord {
                name: format!("{}_ref_fk", table.name),
                table: table.clone(),
                columns: vec!["a".to_string()],
                ref_table: TableRef::new(None::<String>, Some("archive"), "old_orders"),
                ref_columns: vec!["id".to_string()],
            }]))
        }

        async fn indexes(&self, table: &TableRef) -> Result<RecordSequence<IndexRecord>> {
            self.log("indexes", &table.name);
            if self.unsupported_indexes {
                return Err(IntrospectError::unsupported("mock", "indexes"));
            }
            Ok(RecordSequence::ready(vec![IndexRecord {
                table: table.clone(),
                name: format!("{}_idx", table.name),
                unique: false,
                columns: vec!["a".to_string()],
            }]))
        }

        async fn close(&self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    #[tokio::test]
    async fn test_aggregates_in_traversal_order_and_fully_populated() {
        let dialect = MockDialect::new(vec![
            table("public", "orders"),
            table("public", "customers"),
        ]);
        let extractor = SchemaExtractor::new(Box::new(dialect), ExtractionConfig::default());
        let aggregates = extractor.run().await.unwrap().collect().await.unwrap();

        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].table.name, "orders");
        assert_eq!(aggregates[1].table.name, "customers");
        for aggregate in &aggregates {
            assert_eq!(aggregate.columns.len(), 2);
            assert!(aggregate.primary_key.is_some());
            assert_eq!(aggregate.foreign_keys.len(), 1);
            assert_eq!(aggregate.indexes.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_ordinals_renumbered_contiguously() {
        let dialect = MockDialect::new(vec![table("public", "orders")]);
        let extractor = SchemaExtractor::new(Box::new(dialect), ExtractionConfig::default());
        let aggregates = extractor.run().await.unwrap().collect().await.unwrap();

        let columns = &aggregates[0].columns;
        assert_eq!(columns[0].name, "a");
        assert_eq!(columns[0].ordinal, 1);
        assert_eq!(columns[1].name, "b");
        assert_eq!(columns[1].ordinal, 2);
    }

    #[tokio::test]
    async fn test_excluded_tables_get_no_detail_queries() {
        let dialect = MockDialect::new(vec![
            table("public", "orders"),
            table("public", "tmp_scratch"),
        ]);
        let calls = dialect.calls.clone();

        let config = ExtractionConfig {
            exclude_tables: vec!["tmp_*".to_string()],
            ..Default::default()
        };
        let aggregates = SchemaExtractor::new(Box::new(dialect), config)
            .run()
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].table.name, "orders");

        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.contains("tmp_scratch")));
    }

    #[tokio::test]
    async fn test_schema_filter_applies() {
        let dialect = MockDialect::new(vec![
            table("public", "orders"),
            table("audit", "orders_log"),
        ]);
        let config = ExtractionConfig {
            include_schemas: vec!["public".to_string()],
            ..Default::default()
        };
        let aggregates = SchemaExtractor::new(Box::new(dialect), config)
            .run()
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].table.schema.as_deref(), Some("public"));
    }

    #[tokio::test]
    async fn test_detail_failure_aborts_run_with_context() {
        let mut dialect = MockDialect::new(vec![
            table("public", "orders"),
            table("public", "payments"),
        ]);
        dialect.fail_columns_for = Some("payments".to_string());

        let mut aggregates = SchemaExtractor::new(Box::new(dialect), ExtractionConfig::default())
            .run()
            .await
            .unwrap();

        assert!(aggregates.try_next().await.unwrap().is_some());

        let err = aggregates.try_next().await.unwrap_err();
        assert!(err.to_string().contains("public.payments"));

        // the sequence stays terminated
        assert!(aggregates.try_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_indexes_degrade_to_empty() {
        let mut dialect = MockDialect::new(vec![table("public", "orders")]);
        dialect.unsupported_indexes = true;

        let aggregates = SchemaExtractor::new(Box::new(dialect), ExtractionConfig::default())
            .run()
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        assert_eq!(aggregates.len(), 1);
        assert!(aggregates[0].indexes.is_empty());
        // nothing else degraded
        assert_eq!(aggregates[0].columns.len(), 2);
    }

    #[tokio::test]
    async fn test_foreign_key_targets_outside_scope_are_preserved() {
        let dialect = MockDialect::new(vec![table("public", "orders")]);
        let config = ExtractionConfig {
            include_schemas: vec!["public".to_string()],
            ..Default::default()
        };
        let aggregates = SchemaExtractor::new(Box::new(dialect), config)
            .run()
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        // the archive schema is filtered out, yet the reference identity
        // survives and no aggregate was produced for its table
        let fk = &aggregates[0].foreign_keys[0];
        assert_eq!(fk.ref_table.schema.as_deref(), Some("archive"));
        assert_eq!(aggregates.len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_checked_between_tables() {
        let dialect = MockDialect::new(vec![
            table("public", "orders"),
            table("public", "customers"),
        ]);
        let (tx, rx) = watch::channel(false);

        let mut aggregates = SchemaExtractor::new(Box::new(dialect), ExtractionConfig::default())
            .with_cancellation(rx)
            .run()
            .await
            .unwrap();

        assert!(aggregates.try_next().await.unwrap().is_some());

        tx.send(true).unwrap();
        let err = aggregates.try_next().await.unwrap_err();
        assert!(matches!(err, IntrospectError::Cancelled));
        assert!(aggregates.try_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_releases_dialect() {
        let dialect = MockDialect::new(vec![]);
        let closed = dialect.closed.clone();

        let aggregates = SchemaExtractor::new(Box::new(dialect), ExtractionConfig::default())
            .run()
            .await
            .unwrap();
        aggregates.close().await;

        assert_eq!(*closed.lock().unwrap(), 1);
    }
}
