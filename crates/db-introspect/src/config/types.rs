//! Configuration type definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Settings key forcing a specific metadata dialect implementation.
///
/// The value is the implementation's fully-qualified type path or bare type
/// name, or a name registered with
/// [`MetaDialectFactory::register`](crate::dialect::MetaDialectFactory::register).
pub const METADATA_DIALECT_KEY: &str = "introspect.metadatadialect";

/// Flat string-keyed properties.
///
/// The one key this crate interprets is [`METADATA_DIALECT_KEY`]; everything
/// else passes through to downstream generators untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The metadata dialect override, if set to a non-blank value. Blank and
    /// absent values are equivalent: resolution proceeds by engine match.
    pub fn metadata_dialect(&self) -> Option<&str> {
        self.get(METADATA_DIALECT_KEY)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Connection parameters for a driver adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type ("postgres", "mysql", "mssql").
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port. Defaults to the engine's conventional port when 0.
    #[serde(default)]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// SSL mode for PostgreSQL connections (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// Encrypt SQL Server connections (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust the server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

impl ConnectionConfig {
    /// The effective port: the configured one, or the engine's conventional
    /// default when unset.
    pub fn effective_port(&self) -> u16 {
        if self.port != 0 {
            return self.port;
        }
        match self.r#type.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => 5432,
            "mysql" | "mariadb" => 3306,
            "mssql" | "sqlserver" | "sql_server" => 1433,
            _ => 0,
        }
    }
}

/// What to extract: namespace selection plus include/exclude filters.
///
/// Include/exclude lists take glob-like patterns (`*`, `?`) and are applied
/// before any per-table detail query is issued.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Catalog to scan. `None` scans the connection's default.
    pub catalog: Option<String>,

    /// Schema to scan. `None` scans the connection's default.
    pub schema: Option<String>,

    /// SQL LIKE pattern narrowing the table enumeration in the engine.
    pub table_pattern: Option<String>,

    /// Schemas to include (glob patterns).
    #[serde(default)]
    pub include_schemas: Vec<String>,

    /// Schemas to exclude (glob patterns).
    #[serde(default)]
    pub exclude_schemas: Vec<String>,

    /// Tables to include (glob patterns).
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Tables to exclude (glob patterns).
    #[serde(default)]
    pub exclude_tables: Vec<String>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection to introspect.
    pub connection: ConnectionConfig,

    /// Extraction scope and filters.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Flat pass-through properties, including the dialect override key.
    #[serde(default)]
    pub properties: Settings,
}

fn default_require() -> String {
    "require".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_dialect_blank_is_absent() {
        let mut settings = Settings::new();
        assert_eq!(settings.metadata_dialect(), None);

        settings.set(METADATA_DIALECT_KEY, "   ");
        assert_eq!(settings.metadata_dialect(), None);

        settings.set(METADATA_DIALECT_KEY, "H2MetaDataDialect");
        assert_eq!(settings.metadata_dialect(), Some("H2MetaDataDialect"));
    }

    #[test]
    fn test_effective_port_defaults_by_engine() {
        let mut config = ConnectionConfig {
            r#type: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 0,
            database: "app".to_string(),
            user: "app".to_string(),
            password: String::new(),
            ssl_mode: "require".to_string(),
            encrypt: true,
            trust_server_cert: false,
        };
        assert_eq!(config.effective_port(), 5432);

        config.r#type = "mssql".to_string();
        assert_eq!(config.effective_port(), 1433);

        config.port = 14330;
        assert_eq!(config.effective_port(), 14330);
    }

    #[test]
    fn test_password_not_serialized() {
        let config = ConnectionConfig {
            r#type: "mysql".to_string(),
            host: "localhost".to_string(),
            port: 3306,
            database: "app".to_string(),
            user: "app".to_string(),
            password: "super_secret".to_string(),
            ssl_mode: "require".to_string(),
            encrypt: true,
            trust_server_cert: false,
        };

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(
            !yaml.contains("super_secret"),
            "Password was serialized: {}",
            yaml
        );
    }
}
