//! Runtime error types

use snax_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Bad arguments, rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Predicate text that cannot be parsed or evaluated
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// A referenced column does not exist
    #[error("Column '{column}' not found in {source_name}")]
    ColumnNotFound { column: String, source_name: String },

    /// Insert would overwrite existing rows under the `error` policy
    #[error(
        "Conflict in {source_name}: {rows} row(s) already exist with column(s) [{}]",
        .columns.join(", ")
    )]
    Conflict {
        source_name: String,
        rows: usize,
        columns: Vec<String>,
    },

    /// Database error with the table it happened on
    #[cfg(feature = "sqlx")]
    #[error("Database error on {target}: {source}")]
    Database {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// File I/O error
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delimited text error
    #[error("CSV error on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from snax-core
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
