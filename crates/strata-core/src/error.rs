//! Core error types.

use thiserror::Error;

/// Storage-level errors raised by the group, table and transaction
/// primitives.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying sled error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Table lookup failed.
    #[error("table '{name}' does not exist")]
    TableNotFound {
        /// Name of the missing table.
        name: String,
    },

    /// A table with the same name already exists.
    #[error("table '{name}' already exists")]
    TableAlreadyExists {
        /// Name of the conflicting table.
        name: String,
    },

    /// Column lookup failed.
    #[error("column '{column}' does not exist in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// A column with the same name already exists.
    #[error("column '{column}' already exists in table '{table}'")]
    ColumnAlreadyExists { table: String, column: String },

    /// A value did not match the column type.
    #[error("value type does not match column '{column}' of table '{table}'")]
    TypeMismatch { table: String, column: String },

    /// A non-nullable column would have to hold null values.
    #[error("column '{column}' of table '{table}' cannot hold null values")]
    NullConstraintViolation { table: String, column: String },

    /// The requested index kind is not supported on the column type.
    #[error("index is not supported on column '{column}' of table '{table}'")]
    InvalidIndex { table: String, column: String },

    /// Embedded tables cannot carry a primary key.
    #[error("embedded table '{table}' cannot have a primary key")]
    EmbeddedPrimaryKey { table: String },

    /// Converting a table to embedded found rows without incoming links.
    #[error("cannot convert table '{table}' to embedded: {count} rows have no incoming links")]
    EmbeddedOrphans { table: String, count: usize },

    /// A primary key column contains null values.
    #[error("primary key column of table '{table}' contains null values")]
    NullPrimaryKey { table: String },

    /// A primary key column contains duplicate values.
    #[error("primary key column of table '{table}' contains duplicate values")]
    DuplicatePrimaryKey { table: String },

    /// Row lookup failed.
    #[error("row {row} does not exist in table '{table}'")]
    RowNotFound { table: String, row: u64 },
}
