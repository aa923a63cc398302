//! Metadata dialect resolution.
//!
//! One [`MetaDataDialect`] is chosen per extraction run, in strict priority
//! order:
//!
//! 1. an explicit override in the settings
//!    ([`METADATA_DIALECT_KEY`](crate::config::METADATA_DIALECT_KEY)); an
//!    unresolvable override is a hard configuration error, never a silent
//!    fallback;
//! 2. an exact registry match on the engine identifier (case-insensitive,
//!    after stripping the conventional `Dialect` suffix, so versioned
//!    variants of a family land on the same implementation);
//! 3. a substring match in either direction, first registry entry wins;
//!    entries are declared most-specific-first so the tie-break is
//!    deterministic;
//! 4. the generic fallback, which never fails merely because an engine is
//!    unrecognized.
//!
//! The registry is compile-time. The "override by name" capability is kept
//! without runtime reflection: built-in implementations resolve by type
//! name, and callers can [`register`](MetaDialectFactory::register) their
//! own factory functions at startup.

pub mod generic;
pub mod h2;
pub mod hsql;
pub mod mysql;
pub mod oracle;

pub use generic::{GenericMetaDataDialect, IdentCase};
pub use h2::H2MetaDataDialect;
pub use hsql::HsqlMetaDataDialect;
pub use mysql::MySqlMetaDataDialect;
pub use oracle::OracleMetaDataDialect;

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Settings;
use crate::core::traits::{MetaDataDialect, MetaQuery};
use crate::error::{IntrospectError, Result};

/// The upstream SQL dialect: an object identifying the target engine.
///
/// `identifier()` is conventionally the implementing type's name (for
/// example `Oracle9iDialect`); a module path prefix is tolerated and
/// stripped during resolution.
pub trait SqlDialect: Send + Sync {
    fn identifier(&self) -> Cow<'_, str>;
}

/// The resolved engine identifier an extraction run is keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineIdentity {
    identifier: String,
}

impl EngineIdentity {
    pub fn from_dialect(dialect: &dyn SqlDialect) -> Self {
        Self::from_name(dialect.identifier())
    }

    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            identifier: name.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The identifier with any `::`/`.` path prefix removed.
    fn simple_name(&self) -> &str {
        simple_name(&self.identifier)
    }

    /// The simple name with the conventional `Dialect` suffix removed.
    fn stem(&self) -> &str {
        let simple = self.simple_name();
        match simple.len().checked_sub("Dialect".len()) {
            Some(cut) if simple[cut..].eq_ignore_ascii_case("Dialect") => &simple[..cut],
            _ => simple,
        }
    }
}

impl std::fmt::Display for EngineIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identifier)
    }
}

fn simple_name(name: &str) -> &str {
    let after_colons = name.rsplit("::").next().unwrap_or(name);
    after_colons.rsplit('.').next().unwrap_or(after_colons)
}

/// The specialized metadata dialect implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaDialectKind {
    Oracle,
    MySql,
    H2,
    Hsql,
}

impl MetaDialectKind {
    const ALL: [MetaDialectKind; 4] = [
        MetaDialectKind::Oracle,
        MetaDialectKind::MySql,
        MetaDialectKind::H2,
        MetaDialectKind::Hsql,
    ];

    /// The implementation's type name, accepted as an override value.
    pub fn type_name(&self) -> &'static str {
        match self {
            MetaDialectKind::Oracle => "OracleMetaDataDialect",
            MetaDialectKind::MySql => "MySqlMetaDataDialect",
            MetaDialectKind::H2 => "H2MetaDataDialect",
            MetaDialectKind::Hsql => "HsqlMetaDataDialect",
        }
    }

    /// Construct the implementation over the given connection.
    pub fn instantiate(&self, conn: Arc<dyn MetaQuery>) -> Box<dyn MetaDataDialect> {
        match self {
            MetaDialectKind::Oracle => Box::new(OracleMetaDataDialect::new(conn)),
            MetaDialectKind::MySql => Box::new(MySqlMetaDataDialect::new(conn)),
            MetaDialectKind::H2 => Box::new(H2MetaDataDialect::new(conn)),
            MetaDialectKind::Hsql => Box::new(HsqlMetaDataDialect::new(conn)),
        }
    }
}

/// Engine family → implementation, in declaration order. Resolution walks
/// this slice top to bottom, so fuzzy ties break deterministically.
const REGISTRY: &[(&str, MetaDialectKind)] = &[
    ("Oracle", MetaDialectKind::Oracle),
    ("MySQL", MetaDialectKind::MySql),
    ("H2", MetaDialectKind::H2),
    ("HSQL", MetaDialectKind::Hsql),
];

/// Factory function for a caller-supplied metadata dialect.
pub type DialectFactoryFn =
    Arc<dyn Fn(Arc<dyn MetaQuery>) -> Box<dyn MetaDataDialect> + Send + Sync>;

/// Chooses and constructs exactly one metadata dialect per extraction run.
///
/// Resolution is a pure function of (identifier, settings); the factory
/// carries no mutable cross-call state beyond the override registrations
/// made at startup.
#[derive(Default, Clone)]
pub struct MetaDialectFactory {
    overrides: Vec<(String, DialectFactoryFn)>,
}

impl MetaDialectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named factory usable as an override value.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(Arc<dyn MetaQuery>) -> Box<dyn MetaDataDialect> + Send + Sync + 'static,
    ) {
        self.overrides.push((name.into(), Arc::new(factory)));
    }

    /// Resolve the specialized implementation for a live dialect object, or
    /// `None` when only the generic one applies.
    pub fn from_dialect(dialect: &dyn SqlDialect) -> Option<MetaDialectKind> {
        Self::resolve(&EngineIdentity::from_dialect(dialect))
    }

    /// Resolve the specialized implementation for a literal engine name, or
    /// `None` when only the generic one applies.
    pub fn from_dialect_name(name: &str) -> Option<MetaDialectKind> {
        Self::resolve(&EngineIdentity::from_name(name))
    }

    fn resolve(identity: &EngineIdentity) -> Option<MetaDialectKind> {
        let stem = identity.stem();
        if stem.is_empty() {
            return None;
        }

        for (key, kind) in REGISTRY {
            if stem.eq_ignore_ascii_case(key) {
                return Some(*kind);
            }
        }

        let stem_lower = stem.to_lowercase();
        for (key, kind) in REGISTRY {
            let key_lower = key.to_lowercase();
            if stem_lower.contains(&key_lower) || key_lower.contains(&stem_lower) {
                return Some(*kind);
            }
        }
        None
    }

    /// Construct the metadata dialect for an extraction run.
    ///
    /// The settings override takes precedence over any engine match; an
    /// unresolvable override fails with a configuration error. Without an
    /// override, an unrecognized (or absent) dialect falls back to the
    /// generic implementation.
    pub fn create_meta_data_dialect(
        &self,
        dialect: Option<&dyn SqlDialect>,
        settings: &Settings,
        conn: Arc<dyn MetaQuery>,
    ) -> Result<Box<dyn MetaDataDialect>> {
        let kind = dialect.and_then(|d| Self::from_dialect(d));
        self.create(kind, settings, conn)
    }

    /// Variant of [`create_meta_data_dialect`](Self::create_meta_data_dialect)
    /// for callers that only have an engine name, not a dialect object.
    pub fn create_meta_data_dialect_for_name(
        &self,
        name: &str,
        settings: &Settings,
        conn: Arc<dyn MetaQuery>,
    ) -> Result<Box<dyn MetaDataDialect>> {
        self.create(Self::from_dialect_name(name), settings, conn)
    }

    fn create(
        &self,
        kind: Option<MetaDialectKind>,
        settings: &Settings,
        conn: Arc<dyn MetaQuery>,
    ) -> Result<Box<dyn MetaDataDialect>> {
        if let Some(override_name) = settings.metadata_dialect() {
            return self.instantiate_override(override_name, conn);
        }

        Ok(match kind {
            Some(kind) => {
                debug!("resolved metadata dialect: {}", kind.type_name());
                kind.instantiate(conn)
            }
            None => {
                debug!("no specialized metadata dialect known; using generic");
                Box::new(GenericMetaDataDialect::new(conn))
            }
        })
    }

    fn instantiate_override(
        &self,
        name: &str,
        conn: Arc<dyn MetaQuery>,
    ) -> Result<Box<dyn MetaDataDialect>> {
        for (registered, factory) in &self.overrides {
            if registered == name {
                info!("using registered metadata dialect override '{}'", name);
                return Ok(factory(conn));
            }
        }

        let simple = simple_name(name);
        for kind in MetaDialectKind::ALL {
            if simple == kind.type_name() {
                info!("using metadata dialect override {}", kind.type_name());
                return Ok(kind.instantiate(conn));
            }
        }
        if simple == "GenericMetaDataDialect" {
            return Ok(Box::new(GenericMetaDataDialect::new(conn)));
        }

        Err(IntrospectError::configuration(format!(
            "metadata dialect override '{}' could not be resolved; \
             register it on the factory or use a built-in implementation name",
            name
        )))
    }
}
