//! FeatureStore - entry point over a loaded feature repository

use crate::config::FeatureStoreConfig;
use crate::error::{Result, SdkError};
use snax_core::{Entity, Table};
use snax_repository::{RepoContents, RepoLoader};
use snax_runtime::{DataSourceRef, FeatureView};
use std::path::Path;

/// Collection of the feature views, entities and data sources of one
/// repository
#[derive(Debug, Clone)]
pub struct FeatureStore {
    config: FeatureStoreConfig,
    contents: RepoContents,
}

impl FeatureStore {
    /// Load the repository named by `config`
    pub async fn open(config: FeatureStoreConfig) -> Result<Self> {
        let contents = RepoLoader::new(&config.repo_path)?.load().await?;
        tracing::info!(
            "Opened feature store at {} with {} feature view(s)",
            config.repo_path.display(),
            contents.feature_views().len()
        );
        Ok(Self { config, contents })
    }

    /// Wrap contents that were assembled in code
    pub fn from_contents(config: FeatureStoreConfig, contents: RepoContents) -> Self {
        Self { config, contents }
    }

    pub fn config(&self) -> &FeatureStoreConfig {
        &self.config
    }

    pub fn repo_path(&self) -> &Path {
        &self.config.repo_path
    }

    pub fn list_feature_views(&self) -> &[FeatureView] {
        self.contents.feature_views()
    }

    pub fn get_feature_view(&self, name: &str) -> Option<&FeatureView> {
        self.contents.get_feature_view(name)
    }

    pub fn list_entities(&self) -> &[Entity] {
        self.contents.entities()
    }

    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.contents.get_entity(name)
    }

    pub fn list_data_sources(&self) -> &[DataSourceRef] {
        self.contents.data_sources()
    }

    pub fn get_data_source(&self, name: &str) -> Option<&DataSourceRef> {
        self.contents.get_data_source(name)
    }

    /// Add features named `feature_view:feature` to `dataframe`.
    ///
    /// References are grouped by feature view and joined view by view, in
    /// order of first appearance. With `entity_name` every view joins on that
    /// entity, looked up in the view first and then in the repository.
    /// Without it each view uses the first of its entities (or of the
    /// repository's entities when it declares none) whose join keys are all
    /// columns of `dataframe`.
    pub async fn add_features_to_dataframe<S: AsRef<str>>(
        &self,
        dataframe: &Table,
        features: &[S],
        entity_name: Option<&str>,
    ) -> Result<Table> {
        let mut output = dataframe.clone();
        for (view_name, feature_names) in group_by_view(features)? {
            let view = self
                .get_feature_view(view_name)
                .ok_or_else(|| SdkError::FeatureViewNotFound(view_name.to_string()))?;
            let entity = match entity_name {
                Some(name) => view
                    .entity(name)
                    .or_else(|| self.get_entity(name).cloned())
                    .ok_or_else(|| SdkError::EntityNotFound(name.to_string()))?,
                None => self.infer_entity(view, &output)?,
            };
            tracing::debug!(
                "Joining {:?} from {} on {}",
                feature_names,
                view_name,
                entity.name()
            );
            output = view
                .add_features_for_entity(&output, feature_names.as_slice(), &entity)
                .await?;
        }
        Ok(output)
    }

    fn infer_entity(&self, view: &FeatureView, dataframe: &Table) -> Result<Entity> {
        let candidates = view.entities().unwrap_or_else(|| self.contents.entities());
        candidates
            .iter()
            .find(|e| e.join_keys().iter().all(|k| dataframe.has_column(k)))
            .cloned()
            .ok_or_else(|| SdkError::NoMatchingEntity {
                view: view.name().to_string(),
                columns: dataframe.columns().to_vec(),
            })
    }
}

/// Split `view:feature` references and group them by view, keeping the
/// order in which views and features first appear
fn group_by_view<S: AsRef<str>>(features: &[S]) -> Result<Vec<(&str, Vec<&str>)>> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for reference in features {
        let reference = reference.as_ref();
        let (view, feature) = reference
            .split_once(':')
            .filter(|(v, f)| !v.is_empty() && !f.is_empty())
            .ok_or_else(|| SdkError::InvalidFeatureRef(reference.to_string()))?;
        match groups.iter().position(|(name, _)| *name == view) {
            Some(i) if !groups[i].1.contains(&feature) => groups[i].1.push(feature),
            Some(_) => {}
            None => groups.push((view, vec![feature])),
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_view() {
        let groups = group_by_view(&["a:x", "b:y", "a:z", "a:x"]).unwrap();
        assert_eq!(groups, vec![("a", vec!["x", "z"]), ("b", vec!["y"])]);
    }

    #[test]
    fn test_group_by_view_rejects_bad_references() {
        for bad in ["outcome", ":outcome", "games:", ""] {
            assert!(matches!(
                group_by_view(&[bad]),
                Err(SdkError::InvalidFeatureRef(_))
            ));
        }
    }

    #[test]
    fn test_feature_name_may_contain_colon() {
        let groups = group_by_view(&["events:ts:utc"]).unwrap();
        assert_eq!(groups, vec![("events", vec!["ts:utc"])]);
    }
}
