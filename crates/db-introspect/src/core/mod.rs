//! Core types: the metadata record model, lazy sequences, filters, and the
//! traits the dialect and driver layers implement.

pub mod filter;
pub mod records;
pub mod sequence;
pub mod traits;
pub mod value;

pub use filter::{matches_pattern, NameFilter};
pub use records::{
    ColumnRecord, ForeignKeyRecord, IndexRecord, Nullability, PrimaryKeyRecord, SqlType,
    TableKind, TableRecord, TableRef,
};
pub use sequence::{RecordSequence, RowSequence};
pub use traits::{MetaDataDialect, MetaQuery, TableFilter};
pub use value::{MetaRow, MetaValue};
