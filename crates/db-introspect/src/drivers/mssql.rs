//! SQL Server connection adapter.
//!
//! Implements the [`MetaQuery`] port with Tiberius behind a bb8 pool. TDS
//! interleaves metadata and row tokens in one stream, so the feeder task
//! materializes the first result set before relaying it through the row
//! channel.

use std::time::Duration;

use async_trait::async_trait;
use bb8::Pool;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::sequence::RowSequence;
use crate::core::traits::MetaQuery;
use crate::core::value::{MetaRow, MetaValue};
use crate::error::{IntrospectError, Result};

/// Connection acquisition timeout from the pool.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection manager for bb8 with Tiberius.
#[derive(Clone)]
struct MssqlConnectionManager {
    config: ConnectionConfig,
}

impl MssqlConnectionManager {
    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.effective_port());
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        if self.config.encrypt {
            if self.config.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }
        config
    }
}

#[async_trait]
impl bb8::ManageConnection for MssqlConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;
        tcp.set_nodelay(true).ok();
        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// SQL Server metadata connection.
pub struct MssqlMetaQuery {
    pool: Pool<MssqlConnectionManager>,
}

impl MssqlMetaQuery {
    /// Connect and verify the connection with a probe query.
    pub async fn new(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        let manager = MssqlConnectionManager {
            config: config.clone(),
        };
        let pool = Pool::builder()
            .max_size(max_conns as u32)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .build(manager)
            .await?;

        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| IntrospectError::pool(e, "testing SQL Server connection"))?;
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }

        info!(
            "Connected to SQL Server: {}:{}/{}",
            config.host,
            config.effective_port(),
            config.database
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl MetaQuery for MssqlMetaQuery {
    fn placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowSequence> {
        let mut conn = self
            .pool
            .get_owned()
            .await
            .map_err(|e| IntrospectError::pool(e, "acquiring connection for metadata query"))?;
        debug!("metadata query: {}", sql);

        let sql = sql.to_string();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let (tx, seq) = RowSequence::channel();

        tokio::spawn(async move {
            let outcome = async {
                let mut query = Query::new(sql);
                for param in &params {
                    query.bind(param.as_str());
                }
                let stream = query.query(&mut conn).await?;
                let rows = stream.into_first_result().await?;
                for row in rows {
                    if tx.send(Ok(row_to_meta(row))).await.is_err() {
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
        // bb8 closes connections as the pool is dropped; nothing to release
        // eagerly here, and repeated calls stay safe.
    }
}

fn row_to_meta(row: tiberius::Row) -> MetaRow {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut out = MetaRow::new();
    for (name, data) in names.into_iter().zip(row.into_iter()) {
        let value = match data {
            ColumnData::Bit(v) => v.map(MetaValue::Bool),
            ColumnData::U8(v) => v.map(|x| MetaValue::Int(x as i64)),
            ColumnData::I16(v) => v.map(|x| MetaValue::Int(x as i64)),
            ColumnData::I32(v) => v.map(|x| MetaValue::Int(x as i64)),
            ColumnData::I64(v) => v.map(MetaValue::Int),
            ColumnData::F32(v) => v.map(|x| MetaValue::Float(x as f64)),
            ColumnData::F64(v) => v.map(MetaValue::Float),
            ColumnData::String(v) => v.map(|s| MetaValue::Text(s.into_owned())),
            ColumnData::Numeric(v) => v.map(|n| MetaValue::Text(n.to_string())),
            other => {
                debug!("unhandled catalog column value {:?} for '{}'", other, name);
                None
            }
        };
        out.push(name, value.unwrap_or(MetaValue::Null));
    }
    out
}
