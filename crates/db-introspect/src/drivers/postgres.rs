//! PostgreSQL connection adapter.
//!
//! Implements the [`MetaQuery`] port over a deadpool-postgres pool. Rows
//! stream through a bounded channel: a feeder task owns the pooled client
//! and pulls from the wire while the dialect consumes, so large catalogs
//! never materialize in full.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use futures::TryStreamExt;
use tokio_postgres::types::ToSql;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::core::sequence::RowSequence;
use crate::core::traits::MetaQuery;
use crate::core::value::{MetaRow, MetaValue};
use crate::error::{IntrospectError, Result};

use super::common::tls::{build_client_config, SslMode};

/// PostgreSQL metadata connection.
pub struct PostgresMetaQuery {
    pool: Pool,
}

impl PostgresMetaQuery {
    /// Connect and verify the connection with a probe query.
    pub async fn new(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.effective_port());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let ssl_mode: SslMode = config.ssl_mode.parse()?;
        let pool = match ssl_mode {
            SslMode::Disable => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| IntrospectError::pool(e, "creating PostgreSQL pool"))?
            }
            mode => {
                let tls = MakeRustlsConnect::new(build_client_config(mode)?);
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| IntrospectError::pool(e, "creating PostgreSQL pool"))?
            }
        };

        let client = pool
            .get()
            .await
            .map_err(|e| IntrospectError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host,
            config.effective_port(),
            config.database
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl MetaQuery for PostgresMetaQuery {
    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowSequence> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| IntrospectError::pool(e, "acquiring connection for metadata query"))?;
        debug!("metadata query: {}", sql);

        let sql = sql.to_string();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let (tx, seq) = RowSequence::channel();

        tokio::spawn(async move {
            let outcome = async {
                let refs: Vec<&(dyn ToSql + Sync)> =
                    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
                let rows = client.query_raw(&sql, refs).await?;
                futures::pin_mut!(rows);
                while let Some(row) = rows.try_next().await? {
                    if tx.send(Ok(row_to_meta(&row)?)).await.is_err() {
                        break; // consumer dropped the sequence
                    }
                }
                Ok::<_, IntrospectError>(())
            }
            .await;
            if let Err(e) = outcome {
                let _ = tx.send(Err(e)).await;
            }
        });

        Ok(seq)
    }

    async fn close(&self) {
        // Repeated calls are no-ops; deadpool tears down idle connections.
        self.pool.close();
    }
}

fn row_to_meta(row: &tokio_postgres::Row) -> Result<MetaRow> {
    let mut out = MetaRow::new();
    for (i, col) in row.columns().iter().enumerate() {
        let value = match col.type_().name() {
            "bool" => row.try_get::<_, Option<bool>>(i)?.map(MetaValue::Bool),
            "int2" => row
                .try_get::<_, Option<i16>>(i)?
                .map(|v| MetaValue::Int(v as i64)),
            "int4" => row
                .try_get::<_, Option<i32>>(i)?
                .map(|v| MetaValue::Int(v as i64)),
            "int8" => row.try_get::<_, Option<i64>>(i)?.map(MetaValue::Int),
            "oid" => row
                .try_get::<_, Option<u32>>(i)?
                .map(|v| MetaValue::Int(v as i64)),
            "float4" => row
                .try_get::<_, Option<f32>>(i)?
                .map(|v| MetaValue::Float(v as f64)),
            "float8" => row.try_get::<_, Option<f64>>(i)?.map(MetaValue::Float),
            "text" | "varchar" | "bpchar" | "name" => {
                row.try_get::<_, Option<String>>(i)?.map(MetaValue::Text)
            }
            other => {
                debug!(
                    "unhandled catalog column type '{}' for '{}'",
                    other,
                    col.name()
                );
                None
            }
        };
        out.push(col.name(), value.unwrap_or(MetaValue::Null));
    }
    Ok(out)
}
