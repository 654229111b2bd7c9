//! Feature views
//!
//! A feature view groups features and entities read from a single data
//! source. Its main operation looks up feature values for the keys of a
//! caller-supplied table and adds them as new columns.

use crate::error::{Result, RuntimeError};
use crate::source::{missing_column, DataSourceRef, Select};
use snax_core::cast::cast_to_feature_types;
use snax_core::{ColumnLike, Entity, Feature, IfExists, RowKey, Table, Value, DUMMY_ENTITY_NAME};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Named group of features and entities from one data source
#[derive(Clone)]
pub struct FeatureView {
    name: String,
    entities: Option<Vec<Entity>>,
    features: Option<Vec<Feature>>,
    source: DataSourceRef,
    tags: HashMap<String, String>,
}

impl FeatureView {
    pub fn new(
        name: impl Into<String>,
        entities: Option<Vec<Entity>>,
        features: Option<Vec<Feature>>,
        source: DataSourceRef,
    ) -> Self {
        Self {
            name: name.into(),
            entities,
            features,
            source,
            tags: HashMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entities(&self) -> Option<&[Entity]> {
        self.entities.as_deref()
    }

    pub fn features(&self) -> Option<&[Feature]> {
        self.features.as_deref()
    }

    pub fn source(&self) -> &DataSourceRef {
        &self.source
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    /// Entity by name. The dummy entity is known to every view.
    pub fn entity(&self, name: &str) -> Option<Entity> {
        self.entities
            .iter()
            .flatten()
            .find(|e| e.name() == name)
            .cloned()
            .or_else(|| (name == DUMMY_ENTITY_NAME).then(Entity::dummy))
    }

    /// Declared feature by name. Views without declared features accept any
    /// name as an untyped feature.
    pub fn feature(&self, name: &str) -> Option<Feature> {
        match &self.features {
            Some(features) => features.iter().find(|f| f.name == name).cloned(),
            None => Some(Feature::new(name, Default::default())),
        }
    }

    fn require_entity(&self, name: &str) -> Result<Entity> {
        self.entity(name).ok_or_else(|| {
            RuntimeError::InvalidArgument(format!(
                "Feature view '{}' has no entity '{}'",
                self.name, name
            ))
        })
    }

    fn require_features<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Feature>> {
        names
            .iter()
            .map(|name| {
                self.feature(name.as_ref()).ok_or_else(|| {
                    RuntimeError::InvalidArgument(format!(
                        "Feature view '{}' has no feature '{}'",
                        self.name,
                        name.as_ref()
                    ))
                })
            })
            .collect()
    }

    /// Add the named features to `dataframe`, joined on the entity's keys.
    ///
    /// Each input row receives the values of the first stored row with the
    /// same key, cast to the declared feature types; rows without a match get
    /// nulls. The input row order is preserved and existing columns with a
    /// feature's name are overwritten.
    pub async fn add_features_to_dataframe<S: AsRef<str>>(
        &self,
        dataframe: &Table,
        feature_names: &[S],
        entity_name: &str,
    ) -> Result<Table> {
        let entity = self.require_entity(entity_name)?;
        self.add_features_for_entity(dataframe, feature_names, &entity)
            .await
    }

    /// Same as [`add_features_to_dataframe`](Self::add_features_to_dataframe)
    /// for an entity defined outside this view, e.g. a repository-level
    /// entity joined onto a view that declares none.
    pub async fn add_features_for_entity<S: AsRef<str>>(
        &self,
        dataframe: &Table,
        feature_names: &[S],
        entity: &Entity,
    ) -> Result<Table> {
        let join_keys = entity.join_keys().to_vec();
        let features: Vec<Feature> = self
            .require_features(feature_names)?
            .into_iter()
            .filter(|f| !join_keys.contains(&f.name))
            .collect();

        let key_values = dataframe
            .project(&join_keys)
            .map_err(|e| missing_column("dataframe", e))?;

        let mut wanted: Vec<ColumnLike> = join_keys.iter().map(ColumnLike::from).collect();
        wanted.extend(features.iter().map(ColumnLike::from));
        let request = Select::all()
            .columns(wanted)
            .by_key(join_keys.iter().map(ColumnLike::from), key_values.clone());
        let selected = self.source.select(request).await?;
        let selected = cast_to_feature_types(&selected, &features);

        let mut index: HashMap<RowKey, usize> = HashMap::with_capacity(selected.num_rows());
        for (position, row_key) in selected.row_keys(&join_keys)?.into_iter().enumerate() {
            index.entry(row_key).or_insert(position);
        }
        let matches: Vec<Option<usize>> = key_values
            .row_keys(&join_keys)?
            .iter()
            .map(|k| index.get(k).copied())
            .collect();

        let mut output = dataframe.clone();
        for feature in &features {
            let column = selected
                .column_index(&feature.name)
                .ok_or_else(|| RuntimeError::ColumnNotFound {
                    column: feature.name.clone(),
                    source_name: self.source.name().to_string(),
                })?;
            let values: Vec<Value> = matches
                .iter()
                .map(|m| {
                    m.and_then(|row| selected.get(row, column).cloned())
                        .unwrap_or(Value::Null)
                })
                .collect();
            output.set_column(&feature.name, values)?;
        }
        tracing::debug!(
            "{}: added {} feature(s) to {} row(s), {} matched",
            self.name,
            features.len(),
            output.num_rows(),
            matches.iter().filter(|m| m.is_some()).count()
        );
        Ok(output)
    }

    /// Store feature values from `data`, keyed by the entity's join keys
    pub async fn insert_features<S: AsRef<str>>(
        &self,
        entity_name: &str,
        feature_names: &[S],
        data: &Table,
        if_exists: IfExists,
    ) -> Result<()> {
        let entity = self.require_entity(entity_name)?;
        let columns: Vec<ColumnLike> = self
            .require_features(feature_names)?
            .into_iter()
            .map(ColumnLike::Feature)
            .collect();
        self.source
            .insert(&[ColumnLike::Entity(entity)], &columns, data, if_exists)
            .await
    }
}

impl fmt::Debug for FeatureView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureView")
            .field("name", &self.name)
            .field("entities", &self.entities)
            .field("features", &self.features)
            .field("source", &self.source.name())
            .field("tags", &self.tags)
            .finish()
    }
}

fn same_members<T: Eq + std::hash::Hash>(a: &Option<Vec<T>>, b: &Option<Vec<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.iter().collect::<HashSet<_>>() == b.iter().collect::<HashSet<_>>(),
        _ => false,
    }
}

/// Views are equal when name, entity set, feature set and source name match
impl PartialEq for FeatureView {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && same_members(&self.entities, &other.entities)
            && same_members(&self.features, &other.features)
            && self.source.name() == other.source.name()
    }
}
