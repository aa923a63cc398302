//! Database connection adapters.
//!
//! Each adapter implements the [`MetaQuery`](crate::core::traits::MetaQuery)
//! port for one driver stack and is feature-gated:
//!
//! - [`postgres`]: deadpool-postgres / tokio-postgres with rustls
//! - [`mysql`]: SQLx MySQL
//! - [`mssql`]: Tiberius behind a bb8 pool
//!
//! Engines without an in-tree adapter (Oracle, H2's PostgreSQL-compatible
//! port, gateways) connect through any caller-supplied [`MetaQuery`]
//! implementation; the dialect layer only ever sees the port.
//!
//! # Adding New Databases
//!
//! 1. Create a module implementing `MetaQuery` for the driver
//! 2. Add a match arm in [`create_meta_query`]
//! 3. Gate the driver with a feature flag in `Cargo.toml`

#[cfg(feature = "postgres")]
pub mod common;
#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use common::SslMode;
#[cfg(feature = "mssql")]
pub use mssql::MssqlMetaQuery;
#[cfg(feature = "mysql")]
pub use mysql::MySqlMetaQuery;
#[cfg(feature = "postgres")]
pub use postgres::PostgresMetaQuery;

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::core::traits::MetaQuery;
use crate::error::{IntrospectError, Result};

/// Create the connection adapter matching the configured database type.
pub async fn create_meta_query(
    config: &ConnectionConfig,
    max_conns: usize,
) -> Result<Arc<dyn MetaQuery>> {
    match config.r#type.to_lowercase().as_str() {
        #[cfg(feature = "postgres")]
        "postgres" | "postgresql" | "pg" => {
            Ok(Arc::new(PostgresMetaQuery::new(config, max_conns).await?))
        }
        #[cfg(feature = "mysql")]
        "mysql" | "mariadb" => Ok(Arc::new(MySqlMetaQuery::new(config, max_conns).await?)),
        #[cfg(feature = "mssql")]
        "mssql" | "sqlserver" | "sql_server" => {
            Ok(Arc::new(MssqlMetaQuery::new(config, max_conns).await?))
        }
        other => Err(IntrospectError::configuration(format!(
            "Unknown database type: '{}'. Supported types: postgres, mysql, mssql \
             (subject to enabled features)",
            other
        ))),
    }
}
