//! # db-introspect
//!
//! Read-only relational schema introspection with per-engine metadata
//! dialects.
//!
//! The crate reverse-engineers a live database's schema into a normalized,
//! vendor-neutral record model for downstream generators (entity classes,
//! data-access code, documentation). The heavy lifting is the metadata
//! layer: engine catalogs diverge in subtle ways (missing comments,
//! conflated catalog/schema namespaces, duplicate foreign-key rows,
//! case-folded identifiers), and each [`MetaDataDialect`] implementation
//! compensates for its engine's quirks while the
//! [`MetaDialectFactory`] picks the right one per run.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use db_introspect::{
//!     Config, MetaDialectFactory, SchemaExtractor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> db_introspect::Result<()> {
//!     let config = Config::load("introspect.yaml")?;
//!     let conn = db_introspect::drivers::create_meta_query(&config.connection, 4).await?;
//!
//!     let factory = MetaDialectFactory::new();
//!     let dialect = factory.create_meta_data_dialect_for_name(
//!         &config.connection.r#type,
//!         &config.properties,
//!         Arc::clone(&conn),
//!     )?;
//!
//!     let mut tables = SchemaExtractor::new(dialect, config.extraction.clone())
//!         .run()
//!         .await?;
//!     while let Some(aggregate) = tables.try_next().await? {
//!         println!("{}: {} columns", aggregate.qualified_name(), aggregate.columns.len());
//!     }
//!     tables.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod pipeline;

// Re-exports for convenient access
pub use crate::config::{Config, ConnectionConfig, ExtractionConfig, Settings, METADATA_DIALECT_KEY};
pub use crate::core::records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, Nullability, PrimaryKeyRecord, SqlType,
    TableKind, TableRecord, TableRef,
};
pub use crate::core::sequence::{RecordSequence, RowSequence};
pub use crate::core::traits::{MetaDataDialect, MetaQuery, TableFilter};
pub use dialect::{
    EngineIdentity, GenericMetaDataDialect, H2MetaDataDialect, HsqlMetaDataDialect,
    MetaDialectFactory, MetaDialectKind, MySqlMetaDataDialect, OracleMetaDataDialect, SqlDialect,
};
pub use error::{IntrospectError, Result};
pub use pipeline::{SchemaExtractor, TableAggregate, TableAggregates};
