//! snax runtime - data sources for the snax feature store
//!
//! This crate provides the storage side of the feature store: a common
//! select/insert contract implemented by in-memory, delimited-file and
//! relational backends, the insert reconciliation they share, and feature
//! views built on top of them.

pub mod config;
pub mod error;
pub mod feature_view;
pub mod file;
pub mod filter;
pub mod memory;
pub mod source;
pub mod sql;
pub mod upsert;

// Re-export main types
pub use config::{BackendConfig, DataSourceConfig, SqlConfig};
pub use error::{Result, RuntimeError};
pub use feature_view::FeatureView;
pub use file::FileDataSource;
pub use memory::MemoryDataSource;
pub use source::{DataSource, DataSourceRef, FieldMapping, Select, SourceInfo};
pub use sql::{ColumnTypeMap, SqlDialect};
#[cfg(feature = "sqlx")]
pub use sql::{SqlDataSource, SqlPool};
pub use upsert::{RowAction, UpsertPlan};
