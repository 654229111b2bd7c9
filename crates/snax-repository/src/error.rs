//! Error types for repository discovery

use snax_runtime::RuntimeError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur while loading a feature repository
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Repository root does not exist or is not a directory
    #[error("Invalid path: {}", .path.display())]
    InvalidPath { path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in {}: {source}", .path.display())]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Two definitions of the same kind share a name
    #[error("Duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    /// A feature view names a data source or entity that is not defined
    #[error("Feature view '{view}' references unknown {kind} '{name}'")]
    UnknownReference {
        view: String,
        kind: &'static str,
        name: String,
    },

    /// Building a data source failed
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
