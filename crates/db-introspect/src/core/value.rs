//! Untyped row model for metadata queries.
//!
//! Metadata dialects issue SQL against engine catalogs through the
//! [`MetaQuery`](crate::core::traits::MetaQuery) port and receive rows in this
//! driver-neutral shape. The value set is intentionally small: engine
//! catalogs only ever hand back names, numbers, flags, and NULLs.

use crate::error::{IntrospectError, Result};

/// A single cell value from a metadata query.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer view. Engines that CAST catalog numbers to text (or drivers
    /// that decode them that way) still yield a usable value here.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            MetaValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view, tolerant of the spellings engine catalogs actually use:
    /// `YES`/`NO`, `Y`/`N`, `TRUE`/`FALSE`, and 0/1 columns.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(v) => Some(*v),
            MetaValue::Int(v) => Some(*v != 0),
            MetaValue::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                "YES" | "Y" | "TRUE" | "1" => Some(true),
                "NO" | "N" | "FALSE" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<i32> for MetaValue {
    fn from(v: i32) -> Self {
        MetaValue::Int(v as i64)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl<T> From<Option<T>> for MetaValue
where
    T: Into<MetaValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(MetaValue::Null)
    }
}

/// One row of a metadata result set: ordered (column name, value) pairs.
///
/// Column names are compared case-insensitively because engines disagree on
/// the case of result-set labels (Oracle uppercases them, PostgreSQL folds
/// them down).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaRow {
    columns: Vec<(String, MetaValue)>,
}

impl MetaRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<MetaValue>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Builder-style variant of [`push`](Self::push), convenient in tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(MetaValue::as_str)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_str(name).map(str::to_string)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(MetaValue::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(MetaValue::as_bool)
    }

    /// Fetch a mandatory text column, failing with a descriptive error when
    /// the engine did not return it.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.get_str(name).ok_or_else(|| {
            IntrospectError::extraction(
                "metadata row",
                format!("missing mandatory column '{}'", name),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_is_case_insensitive() {
        let row = MetaRow::new().with("TABLE_NAME", "ORDERS");
        assert_eq!(row.get_str("table_name"), Some("ORDERS"));
        assert_eq!(row.get_str("Table_Name"), Some("ORDERS"));
        assert_eq!(row.get_str("other"), None);
    }

    #[test]
    fn test_bool_spellings() {
        assert_eq!(MetaValue::from("YES").as_bool(), Some(true));
        assert_eq!(MetaValue::from("n").as_bool(), Some(false));
        assert_eq!(MetaValue::from("TRUE").as_bool(), Some(true));
        assert_eq!(MetaValue::Int(0).as_bool(), Some(false));
        assert_eq!(MetaValue::Int(2).as_bool(), Some(true));
        assert_eq!(MetaValue::from("maybe").as_bool(), None);
        assert_eq!(MetaValue::Null.as_bool(), None);
    }

    #[test]
    fn test_int_parses_text() {
        assert_eq!(MetaValue::from("  42 ").as_i64(), Some(42));
        assert_eq!(MetaValue::Int(7).as_i64(), Some(7));
        assert_eq!(MetaValue::from("x").as_i64(), None);
    }

    #[test]
    fn test_option_into_null() {
        let none: Option<i64> = None;
        assert_eq!(MetaValue::from(none), MetaValue::Null);
        assert_eq!(MetaValue::from(Some(3i64)), MetaValue::Int(3));
    }

    #[test]
    fn test_require_str_reports_column() {
        let row = MetaRow::new();
        let err = row.require_str("table_name").unwrap_err();
        assert!(err.to_string().contains("table_name"));
    }
}
