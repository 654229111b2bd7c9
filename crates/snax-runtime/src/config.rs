//! Data Source Configuration
//!
//! Declarative description of a data source, as found in repository
//! manifests:
//!
//! ```yaml
//! name: users
//! type: sql
//! provider: postgres
//! connection_string: ${DATABASE_URL}
//! table: users
//! field_mapping:
//!   user_name: name
//! ```
//!
//! `${VAR}` references in paths and connection strings are replaced with
//! environment variables when the source is built.

use crate::error::{Result, RuntimeError};
use crate::file::FileDataSource;
use crate::memory::MemoryDataSource;
use crate::source::{DataSourceRef, SourceInfo};
use crate::sql::{ColumnTypeMap, SqlDialect};
use regex::Regex;
use serde::{Deserialize, Serialize};
use snax_core::Table;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Data source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Data source name (unique identifier)
    pub name: String,

    /// Internal field name -> feature name
    #[serde(default)]
    pub field_mapping: HashMap<String, String>,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Backend type
    #[serde(flatten)]
    pub backend: BackendConfig,
}

/// Backend types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-process table, optionally seeded with rows
    Memory {
        #[serde(default)]
        data: Option<Table>,
    },

    /// Delimited text file
    Csv {
        path: String,
        #[serde(default = "default_separator")]
        separator: char,
    },

    /// Database table
    Sql(SqlConfig),
}

/// SQL database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Database type
    pub provider: SqlDialect,

    /// Connection string
    pub connection_string: String,

    /// Schema holding the table (database default if absent)
    #[serde(default)]
    pub schema: Option<String>,

    pub table: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// SQL types for added columns, per value type
    #[serde(default)]
    pub column_types: ColumnTypeMap,
}

fn default_separator() -> char {
    ','
}

fn default_pool_size() -> u32 {
    5
}

impl DataSourceConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Build the data source. Relative file paths resolve against `base_dir`.
    pub async fn build(&self, base_dir: Option<&Path>) -> Result<DataSourceRef> {
        let info = SourceInfo::new(self.name.clone())
            .with_field_mapping(self.field_mapping.clone())?
            .with_tags(self.tags.clone());

        let source: DataSourceRef = match &self.backend {
            BackendConfig::Memory { data } => Arc::new(MemoryDataSource::with_info(
                info,
                data.clone().unwrap_or_default(),
            )),
            BackendConfig::Csv { path, separator } => {
                if !separator.is_ascii() {
                    return Err(RuntimeError::Config(format!(
                        "{}: separator must be an ASCII character, got '{}'",
                        self.name, separator
                    )));
                }
                let separator = *separator as u8;
                let mut path = PathBuf::from(expand_env(path)?);
                if let (true, Some(base)) = (path.is_relative(), base_dir) {
                    path = base.join(path);
                }
                Arc::new(FileDataSource::with_info(info, path).with_separator(separator))
            }
            BackendConfig::Sql(sql) => build_sql(info, sql).await?,
        };
        tracing::debug!("Built data source {}", self.name);
        Ok(source)
    }
}

#[cfg(feature = "sqlx")]
async fn build_sql(info: SourceInfo, config: &SqlConfig) -> Result<DataSourceRef> {
    use crate::sql::{SqlDataSource, SqlPool};

    let connection_string = expand_env(&config.connection_string)?;
    let pool = SqlPool::connect(config.provider, &connection_string, config.pool_size)
        .await
        .map_err(|source| RuntimeError::Database {
            target: info.name().to_string(),
            source,
        })?;
    let source = SqlDataSource::new(info, pool, config.schema.clone(), config.table.clone())
        .await?
        .with_column_types(config.column_types.clone());
    Ok(Arc::new(source))
}

#[cfg(not(feature = "sqlx"))]
async fn build_sql(info: SourceInfo, _config: &SqlConfig) -> Result<DataSourceRef> {
    Err(RuntimeError::Config(format!(
        "{}: SQL data sources require the sqlx feature",
        info.name()
    )))
}

/// Replace `${VAR}` references with environment variable values
pub fn expand_env(text: &str) -> Result<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok())
        .as_ref()
    else {
        return Ok(text.to_string());
    };

    let mut expanded = String::with_capacity(text.len());
    let mut last = 0;
    for captures in pattern.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = std::env::var(name.as_str()).map_err(|_| {
            RuntimeError::Config(format!("environment variable {} is not set", name.as_str()))
        })?;
        expanded.push_str(&text[last..whole.start()]);
        expanded.push_str(&value);
        last = whole.end();
    }
    expanded.push_str(&text[last..]);
    Ok(expanded)
}
