//! Metadata record types for tables, columns, keys, and indexes.
//!
//! These types form a database-agnostic representation of a relational
//! schema. They are value objects: one extraction run produces them, the
//! model builder consumes them, and they hold no reference back to the live
//! connection.

use serde::{Deserialize, Serialize};

/// Vendor-neutral classification of a column's SQL type.
///
/// Engines report native type names (`VARCHAR2`, `int4`, `NUMBER`); this
/// enum is the normalized code generators switch on. The native name is
/// always preserved alongside it in [`ColumnRecord::type_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Decimal,
    Real,
    Float,
    Double,
    Binary,
    Varbinary,
    LongVarbinary,
    Blob,
    Date,
    Time,
    Timestamp,
    Other,
}

impl SqlType {
    /// Classify a native type name reported by an engine catalog.
    ///
    /// Unknown names classify as [`SqlType::Other`] rather than failing;
    /// generators treat those as opaque.
    pub fn from_type_name(name: &str) -> Self {
        // Strip any trailing size/precision spec: "varchar(255)" -> "varchar"
        let base = name.split('(').next().unwrap_or(name).trim();
        match base.to_ascii_lowercase().as_str() {
            "char" | "character" | "bpchar" | "nchar" => SqlType::Char,
            "varchar" | "varchar2" | "nvarchar" | "nvarchar2" | "character varying"
            | "varying character" => SqlType::Varchar,
            "text" | "tinytext" | "mediumtext" | "longtext" | "long" | "ntext" => {
                SqlType::LongVarchar
            }
            "clob" | "nclob" => SqlType::Clob,
            "bit" => SqlType::Bit,
            "boolean" | "bool" => SqlType::Boolean,
            "tinyint" => SqlType::TinyInt,
            "smallint" | "int2" => SqlType::SmallInt,
            "int" | "integer" | "int4" | "mediumint" => SqlType::Integer,
            "bigint" | "int8" => SqlType::BigInt,
            "numeric" | "number" => SqlType::Numeric,
            "decimal" | "dec" => SqlType::Decimal,
            "real" | "float4" | "binary_float" => SqlType::Real,
            "float" => SqlType::Float,
            "double" | "double precision" | "float8" | "binary_double" => SqlType::Double,
            "binary" => SqlType::Binary,
            "varbinary" | "bytea" | "raw" => SqlType::Varbinary,
            "long raw" | "image" => SqlType::LongVarbinary,
            "blob" | "tinyblob" | "mediumblob" | "longblob" => SqlType::Blob,
            "date" => SqlType::Date,
            "time" | "time without time zone" | "time with time zone" => SqlType::Time,
            "timestamp" | "timestamptz" | "timestamp without time zone"
            | "timestamp with time zone" | "datetime" | "datetime2" | "smalldatetime" => {
                SqlType::Timestamp
            }
            _ => SqlType::Other,
        }
    }
}

/// Whether a record describes a base table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    /// Classify the `TABLE_TYPE` strings engine catalogs report
    /// (`BASE TABLE`, `TABLE`, `VIEW`, `SYSTEM VIEW`, ...).
    pub fn from_type_name(table_type: &str) -> Self {
        if table_type.to_ascii_uppercase().contains("VIEW") {
            TableKind::View
        } else {
            TableKind::Table
        }
    }
}

/// Column nullability as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nullability {
    NotNull,
    Nullable,
    Unknown,
}

impl From<Option<bool>> for Nullability {
    fn from(v: Option<bool>) -> Self {
        match v {
            Some(true) => Nullability::Nullable,
            Some(false) => Nullability::NotNull,
            None => Nullability::Unknown,
        }
    }
}

/// The (possibly one-level) address of a table within an engine.
///
/// Engines that conflate catalog and schema leave the missing level `None`;
/// name comparison semantics are engine-defined and handled by the dialect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(
        catalog: Option<impl Into<String>>,
        schema: Option<impl Into<String>>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.map(Into::into),
            schema: schema.map(Into::into),
            name: name.into(),
        }
    }

    /// Dotted form used in error context and logs.
    pub fn qualified_name(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(c) = &self.catalog {
            parts.push(c.as_str());
        }
        if let Some(s) = &self.schema {
            parts.push(s.as_str());
        }
        parts.push(self.name.as_str());
        parts.join(".")
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// One relational table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub kind: TableKind,
    /// Descriptive comment, when the engine exposes one.
    pub remarks: Option<String>,
}

impl TableRecord {
    pub fn table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    pub fn qualified_name(&self) -> String {
        self.table_ref().qualified_name()
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub name: String,
    /// Normalized type code.
    pub sql_type: SqlType,
    /// Native type name as the engine reports it.
    pub type_name: String,
    /// Character length for string types, precision for numeric types.
    pub column_size: Option<u32>,
    /// Scale for numeric types.
    pub decimal_digits: Option<i32>,
    pub nullable: Nullability,
    /// Ordinal position, 1-based. Unique and contiguous per table.
    pub ordinal: u32,
    /// Default value expression, verbatim.
    pub default_value: Option<String>,
}

/// The ordered set of columns forming a table's primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyRecord {
    pub table: TableRef,
    pub name: Option<String>,
    /// Column order defines the key-part sequence.
    pub columns: Vec<String>,
}

/// A referential constraint.
///
/// `columns` and `ref_columns` pair positionally: `columns[i]` references
/// `ref_columns[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRecord {
    pub name: String,
    pub table: TableRef,
    pub columns: Vec<String>,
    pub ref_table: TableRef,
    pub ref_columns: Vec<String>,
}

/// An index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub table: TableRef,
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_type_classification() {
        assert_eq!(SqlType::from_type_name("VARCHAR2"), SqlType::Varchar);
        assert_eq!(
            SqlType::from_type_name("character varying"),
            SqlType::Varchar
        );
        assert_eq!(SqlType::from_type_name("varchar(255)"), SqlType::Varchar);
        assert_eq!(SqlType::from_type_name("NUMBER"), SqlType::Numeric);
        assert_eq!(SqlType::from_type_name("int8"), SqlType::BigInt);
        assert_eq!(SqlType::from_type_name("bytea"), SqlType::Varbinary);
        assert_eq!(SqlType::from_type_name("datetime2"), SqlType::Timestamp);
        assert_eq!(SqlType::from_type_name("geography"), SqlType::Other);
    }

    #[test]
    fn test_table_kind_classification() {
        assert_eq!(TableKind::from_type_name("BASE TABLE"), TableKind::Table);
        assert_eq!(TableKind::from_type_name("TABLE"), TableKind::Table);
        assert_eq!(TableKind::from_type_name("VIEW"), TableKind::View);
        assert_eq!(TableKind::from_type_name("SYSTEM VIEW"), TableKind::View);
    }

    #[test]
    fn test_table_ref_qualified_name() {
        let full = TableRef::new(Some("sales"), Some("public"), "orders");
        assert_eq!(full.qualified_name(), "sales.public.orders");

        let schema_only: TableRef = TableRef::new(None::<String>, Some("dbo"), "orders");
        assert_eq!(schema_only.qualified_name(), "dbo.orders");

        let bare = TableRef::new(None::<String>, None::<String>, "orders");
        assert_eq!(bare.qualified_name(), "orders");
    }

    #[test]
    fn test_nullability_from_flag() {
        assert_eq!(Nullability::from(Some(true)), Nullability::Nullable);
        assert_eq!(Nullability::from(Some(false)), Nullability::NotNull);
        assert_eq!(Nullability::from(None), Nullability::Unknown);
    }
}
