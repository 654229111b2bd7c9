//! snax core - shared types for the snax feature store
//!
//! This crate provides the building blocks used by every other snax crate:
//! - `Value` / `ValueType` for cell data and semantic type tags
//! - `Entity`, `Feature` and `ColumnLike` column descriptors
//! - `Table`, the row-major tabular container passed across data sources
//! - tolerant type casting (`cast`)
//! - error types

pub mod cast;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::CoreError;
pub use types::{
    resolve, ColumnLike, Entity, Feature, IfExists, RowKey, Table, Value, ValueType,
    DUMMY_ENTITY_ID, DUMMY_ENTITY_NAME,
};
