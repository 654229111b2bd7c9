//! Data source abstraction
//!
//! A data source is a single logical table stored in some backend. Every
//! backend implements the same two primitives over internal field names
//! (`select_fields` / `insert_fields`) plus a translator from key tuples to
//! its own predicate language. The caller-facing `select` / `insert` live on
//! the trait and handle argument validation, column resolution and the
//! field-mapping round trip, so they behave identically for all backends.

mod field_mapping;

pub use field_mapping::FieldMapping;

use crate::error::{Result, RuntimeError};
use snax_core::{resolve, ColumnLike, CoreError, IfExists, Table};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity and naming metadata shared by all data sources
#[derive(Debug, Clone)]
pub struct SourceInfo {
    name: String,
    field_mapping: FieldMapping,
    tags: HashMap<String, String>,
}

impl SourceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_mapping: FieldMapping::default(),
            tags: HashMap::new(),
        }
    }

    /// Set the `internal field -> feature name` mapping. Fails if it is not
    /// invertible.
    pub fn with_field_mapping(mut self, mapping: HashMap<String, String>) -> Result<Self> {
        self.field_mapping = FieldMapping::new(mapping)?;
        Ok(self)
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_mapping(&self) -> &FieldMapping {
        &self.field_mapping
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
}

/// Equality is by name alone
impl PartialEq for SourceInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SourceInfo {}

impl Hash for SourceInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A selection request.
///
/// Rows are chosen either by a backend-native predicate (`where_predicate`) or
/// by a composite key with the wanted key values, never both. Columns and key
/// values use external feature names; `where_predicate` is passed to the
/// backend verbatim.
#[derive(Debug, Clone, Default)]
pub struct Select {
    pub columns: Option<Vec<ColumnLike>>,
    pub key: Option<Vec<ColumnLike>>,
    pub key_values: Option<Table>,
    pub where_predicate: Option<String>,
}

impl Select {
    /// Select everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns<C: Into<ColumnLike>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn by_key<C: Into<ColumnLike>>(
        mut self,
        key: impl IntoIterator<Item = C>,
        key_values: Table,
    ) -> Self {
        self.key = Some(key.into_iter().map(Into::into).collect());
        self.key_values = Some(key_values);
        self
    }

    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.where_predicate = Some(predicate.into());
        self
    }
}

/// Common contract of all storage backends.
///
/// Implementors provide the `*_fields` primitives over internal field names;
/// callers use `select` and `insert`.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    fn info(&self) -> &SourceInfo;

    fn name(&self) -> &str {
        self.info().name()
    }

    /// Backend predicate matching any of the key tuples in `key_values`.
    ///
    /// `key` and the columns of `key_values` are internal field names.
    fn key_predicate(&self, key: &[String], key_values: &Table) -> Result<String>;

    /// Rows matching `predicate` (all rows if `None`), projected onto
    /// `columns` (all columns if `None`)
    async fn select_fields(
        &self,
        columns: Option<&[String]>,
        predicate: Option<&str>,
    ) -> Result<Table>;

    /// Upsert `key + columns` of `data` under the conflict policy
    async fn insert_fields(
        &self,
        key: &[String],
        columns: &[String],
        data: &Table,
        if_exists: IfExists,
    ) -> Result<()>;

    /// Select a subset of the stored data; result columns carry feature names
    async fn select(&self, request: Select) -> Result<Table> {
        let Select {
            columns,
            key,
            key_values,
            where_predicate,
        } = request;

        if (key.is_some() || key_values.is_some()) && where_predicate.is_some() {
            return Err(RuntimeError::InvalidArgument(format!(
                "{}: cannot select by key and by predicate at the same time",
                self.name()
            )));
        }

        let mapping = self.info().field_mapping();
        let predicate = match (key, key_values) {
            (Some(key), Some(key_values)) => {
                let external_key = resolve(&key);
                if external_key.is_empty() {
                    return Err(RuntimeError::InvalidArgument(format!(
                        "{}: key must resolve to at least one column",
                        self.name()
                    )));
                }
                let mut internal_values = key_values
                    .project(&external_key)
                    .map_err(|e| missing_column(self.name(), e))?;
                internal_values.rename_columns(mapping.internal_lookup());
                let internal_key = mapping.internal_names(&external_key);
                Some(self.key_predicate(&internal_key, &internal_values)?)
            }
            (None, None) => where_predicate,
            _ => {
                return Err(RuntimeError::InvalidArgument(format!(
                    "{}: key and key_values must be given together",
                    self.name()
                )))
            }
        };

        let fields = columns.map(|c| mapping.internal_names(&resolve(&c)));
        let mut selected = self
            .select_fields(fields.as_deref(), predicate.as_deref())
            .await?;
        selected.rename_columns(mapping.external_names());
        Ok(selected)
    }

    /// Insert feature values keyed by `key` into the data source.
    ///
    /// `data` columns use feature names. Stored rows sharing a key with an
    /// incoming row are handled according to `if_exists`.
    async fn insert(
        &self,
        key: &[ColumnLike],
        columns: &[ColumnLike],
        data: &Table,
        if_exists: IfExists,
    ) -> Result<()> {
        let mapping = self.info().field_mapping();
        let key = mapping.internal_names(&resolve(key));
        if key.is_empty() {
            return Err(RuntimeError::InvalidArgument(format!(
                "{}: key must resolve to at least one column",
                self.name()
            )));
        }
        let columns = mapping.internal_names(&resolve(columns));
        let mut internal_data = data.clone();
        internal_data.rename_columns(mapping.internal_lookup());
        self.insert_fields(&key, &columns, &internal_data, if_exists)
            .await
    }
}

/// Shared handle to a data source
pub type DataSourceRef = Arc<dyn DataSource>;

/// Attach the data source name to a missing-column error
pub(crate) fn missing_column(source_name: &str, err: CoreError) -> RuntimeError {
    match err {
        CoreError::ColumnNotFound(column) => RuntimeError::ColumnNotFound {
            column,
            source_name: source_name.to_string(),
        },
        other => RuntimeError::Core(other),
    }
}
