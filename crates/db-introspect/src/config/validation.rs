//! Configuration validation.

use super::Config;
use crate::error::{IntrospectError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.connection.host.is_empty() {
        return Err(IntrospectError::configuration("connection.host is required"));
    }
    if config.connection.database.is_empty() {
        return Err(IntrospectError::configuration(
            "connection.database is required",
        ));
    }
    if config.connection.user.is_empty() {
        return Err(IntrospectError::configuration("connection.user is required"));
    }

    match config.connection.r#type.to_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" | "mysql" | "mariadb" | "mssql" | "sqlserver"
        | "sql_server" => {}
        other => {
            return Err(IntrospectError::configuration(format!(
                "connection.type must be one of postgres, mysql, mssql; got '{}'",
                other
            )));
        }
    }

    match config.connection.ssl_mode.to_lowercase().as_str() {
        "disable" | "require" | "verify-ca" | "verify-full" => {}
        other => {
            return Err(IntrospectError::configuration(format!(
                "Invalid ssl_mode '{}'. Valid options: disable, require, verify-ca, verify-full",
                other
            )));
        }
    }

    for (field, patterns) in [
        ("include_schemas", &config.extraction.include_schemas),
        ("exclude_schemas", &config.extraction.exclude_schemas),
        ("include_tables", &config.extraction.include_tables),
        ("exclude_tables", &config.extraction.exclude_tables),
    ] {
        if patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(IntrospectError::configuration(format!(
                "extraction.{} must not contain blank patterns",
                field
            )));
        }
    }

    Ok(())
}
