//! Error types for schema introspection.

use thiserror::Error;

/// Main error type for introspection operations.
#[derive(Error, Debug)]
pub enum IntrospectError {
    /// Configuration error (invalid YAML, missing fields, unresolvable
    /// metadata-dialect override, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Metadata extraction failed for a specific catalog/schema/table.
    #[error("Metadata extraction failed for {context}: {message}")]
    Extraction { context: String, message: String },

    /// The engine genuinely cannot provide a requested piece of metadata.
    ///
    /// Non-fatal by contract: the extraction pipeline degrades the affected
    /// sequence to empty instead of aborting the run.
    #[error("Engine '{engine}' does not expose {feature} metadata")]
    Unsupported {
        engine: String,
        feature: &'static str,
    },

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// PostgreSQL connection or query error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQL Server connection or query error
    #[cfg(feature = "mssql")]
    #[error("SQL Server error: {0}")]
    MsSql(#[from] tiberius::error::Error),

    /// MySQL/MariaDB connection or query error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Extraction was cancelled between tables.
    #[error("Extraction cancelled")]
    Cancelled,
}

impl IntrospectError {
    /// Create a Configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        IntrospectError::Configuration(message.into())
    }

    /// Create an Extraction error with the catalog/schema/table context where
    /// it occurred.
    pub fn extraction(context: impl Into<String>, message: impl Into<String>) -> Self {
        IntrospectError::Extraction {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an Unsupported error for a feature the engine cannot report.
    pub fn unsupported(engine: impl Into<String>, feature: &'static str) -> Self {
        IntrospectError::Unsupported {
            engine: engine.into(),
            feature,
        }
    }

    /// Create a Pool error with context about where it occurred.
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        IntrospectError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Whether this error is the non-fatal "engine cannot report this"
    /// signal.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, IntrospectError::Unsupported { .. })
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for introspection operations.
pub type Result<T> = std::result::Result<T, IntrospectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_carries_context() {
        let err = IntrospectError::extraction("sales.public.orders", "no such table");
        let msg = err.to_string();
        assert!(msg.contains("sales.public.orders"));
        assert!(msg.contains("no such table"));
    }

    #[test]
    fn test_unsupported_is_non_fatal_marker() {
        let err = IntrospectError::unsupported("generic", "indexes");
        assert!(err.is_unsupported());
        assert!(!IntrospectError::Cancelled.is_unsupported());
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = IntrospectError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error"));
    }
}
