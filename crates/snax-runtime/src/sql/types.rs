//! Column types used when the relational source adds columns

use super::dialect::SqlDialect;
use serde::{Deserialize, Serialize};
use snax_core::ValueType;
use std::collections::HashMap;

/// Per-value-type SQL column type overrides on top of the dialect defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnTypeMap {
    overrides: HashMap<ValueType, String>,
}

impl ColumnTypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, value_type: ValueType, sql_type: impl Into<String>) -> Self {
        self.overrides.insert(value_type, sql_type.into());
        self
    }

    /// SQL type for columns holding `value_type` values
    pub fn sql_type(&self, dialect: SqlDialect, value_type: ValueType) -> String {
        self.overrides
            .get(&value_type)
            .cloned()
            .unwrap_or_else(|| default_sql_type(dialect, value_type).to_string())
    }
}

impl From<HashMap<ValueType, String>> for ColumnTypeMap {
    fn from(overrides: HashMap<ValueType, String>) -> Self {
        Self { overrides }
    }
}

/// Built-in column type. Lists are stored as JSON text.
pub fn default_sql_type(dialect: SqlDialect, value_type: ValueType) -> &'static str {
    match (dialect, value_type) {
        (SqlDialect::Postgres, ValueType::Int) => "BIGINT",
        (SqlDialect::Postgres, ValueType::Float) => "DOUBLE PRECISION",
        (SqlDialect::Postgres, ValueType::Bool) => "SMALLINT",
        (SqlDialect::Postgres, ValueType::Timestamp) => "TIMESTAMP",
        (SqlDialect::Postgres, _) => "TEXT",
        (SqlDialect::Sqlite, ValueType::Int | ValueType::Bool) => "INTEGER",
        (SqlDialect::Sqlite, ValueType::Float) => "REAL",
        (SqlDialect::Sqlite, _) => "TEXT",
    }
}
