//! MySQL/MariaDB connection adapter.
//!
//! Implements the [`MetaQuery`] port over a SQLx pool. The feeder task
//! drives SQLx's fetch stream into the bounded row channel.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Row, TypeInfo};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::sequence::RowSequence;
use crate::core::traits::MetaQuery;
use crate::core::value::{MetaRow, MetaValue};
use crate::error::{IntrospectError, Result};

/// Connection acquisition timeout from the pool.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL/MariaDB metadata connection.
pub struct MySqlMetaQuery {
    pool: MySqlPool,
}

impl MySqlMetaQuery {
    /// Connect and verify the connection with a probe query.
    pub async fn new(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.effective_port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(max_conns as u32)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| IntrospectError::pool(e, "creating MySQL pool"))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| IntrospectError::pool(e, "testing MySQL connection"))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host,
            config.effective_port(),
            config.database
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl MetaQuery for MySqlMetaQuery {
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowSequence> {
        debug!("metadata query: {}", sql);

        let pool = self.pool.clone();
        let sql = sql.to_string();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let (tx, seq) = RowSequence::channel();

        tokio::spawn(async move {
            let outcome = async {
                let mut query = sqlx::query(&sql);
                for param in &params {
                    query = query.bind(param);
                }
                let mut rows = query.fetch(&pool);
                while let Some(row) = rows.try_next().await? {
                    if tx.send(Ok(row_to_meta(&row))).await.is_err() {
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
        // Idempotent; SQLx ignores repeated close calls.
        self.pool.close().await;
    }
}

fn row_to_meta(row: &MySqlRow) -> MetaRow {
    let mut out = MetaRow::new();
    for (i, col) in row.columns().iter().enumerate() {
        let type_name = col.type_info().name().to_uppercase();
        let value = match type_name.as_str() {
            "BOOLEAN" => row
                .try_get::<Option<bool>, _>(i)
                .ok()
                .flatten()
                .map(MetaValue::Bool),
            "TINYINT" => int_value::<i8>(row, i),
            "SMALLINT" => int_value::<i16>(row, i),
            "INT" | "MEDIUMINT" => int_value::<i32>(row, i),
            "BIGINT" => int_value::<i64>(row, i),
            "TINYINT UNSIGNED" => uint_value::<u8>(row, i),
            "SMALLINT UNSIGNED" => uint_value::<u16>(row, i),
            "INT UNSIGNED" | "MEDIUMINT UNSIGNED" => uint_value::<u32>(row, i),
            "BIGINT UNSIGNED" => uint_value::<u64>(row, i),
            "FLOAT" => row
                .try_get::<Option<f32>, _>(i)
                .ok()
                .flatten()
                .map(|v| MetaValue::Float(v as f64)),
            "DOUBLE" => row
                .try_get::<Option<f64>, _>(i)
                .ok()
                .flatten()
                .map(MetaValue::Float),
            "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" => row
                .try_get::<Option<String>, _>(i)
                .ok()
                .flatten()
                .map(MetaValue::Text),
            // information_schema text columns surface as binary under some
            // collations
            "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
                .try_get::<Option<Vec<u8>>, _>(i)
                .ok()
                .flatten()
                .map(|bytes| MetaValue::Text(String::from_utf8_lossy(&bytes).into_owned())),
            other => {
                debug!(
                    "unhandled catalog column type '{}' for '{}'",
                    other,
                    col.name()
                );
                None
            }
        };
        out.push(col.name().to_string(), value.unwrap_or(MetaValue::Null));
    }
    out
}

fn int_value<'r, T>(row: &'r MySqlRow, i: usize) -> Option<MetaValue>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Into<i64>,
{
    row.try_get::<Option<T>, _>(i)
        .ok()
        .flatten()
        .map(|v| MetaValue::Int(v.into()))
}

fn uint_value<'r, T>(row: &'r MySqlRow, i: usize) -> Option<MetaValue>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Into<u64>,
{
    row.try_get::<Option<T>, _>(i)
        .ok()
        .flatten()
        .map(|v| MetaValue::Int(v.into() as i64))
}
