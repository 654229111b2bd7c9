//! Error types for snax core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
