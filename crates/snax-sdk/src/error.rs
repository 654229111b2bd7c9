//! SDK error types

use snax_repository::RepositoryError;
use snax_runtime::RuntimeError;
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Repository could not be loaded
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Data source or feature view error
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Feature reference not of the form `view:feature`
    #[error("Invalid feature reference '{0}', expected 'feature_view:feature'")]
    InvalidFeatureRef(String),

    #[error("Feature view '{0}' not found")]
    FeatureViewNotFound(String),

    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    /// No entity of the view has all its join keys in the dataframe
    #[error(
        "No entity of feature view '{view}' has its join keys in the dataframe \
         columns {columns:?}"
    )]
    NoMatchingEntity { view: String, columns: Vec<String> },
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
