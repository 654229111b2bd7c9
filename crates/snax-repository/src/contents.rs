//! Loaded repository contents

use snax_core::Entity;
use snax_runtime::{DataSource, DataSourceRef, FeatureView};

/// Data sources, entities and feature views defined by a repository.
///
/// Entities always end with the synthetic dummy entity.
#[derive(Clone, Default)]
pub struct RepoContents {
    data_sources: Vec<DataSourceRef>,
    entities: Vec<Entity>,
    feature_views: Vec<FeatureView>,
}

impl RepoContents {
    pub fn new(
        data_sources: Vec<DataSourceRef>,
        mut entities: Vec<Entity>,
        feature_views: Vec<FeatureView>,
    ) -> Self {
        let dummy = Entity::dummy();
        if !entities.contains(&dummy) {
            entities.push(dummy);
        }
        Self {
            data_sources,
            entities,
            feature_views,
        }
    }

    pub fn data_sources(&self) -> &[DataSourceRef] {
        &self.data_sources
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn feature_views(&self) -> &[FeatureView] {
        &self.feature_views
    }

    pub fn get_data_source(&self, name: &str) -> Option<&DataSourceRef> {
        self.data_sources.iter().find(|s| s.name() == name)
    }

    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    pub fn get_feature_view(&self, name: &str) -> Option<&FeatureView> {
        self.feature_views.iter().find(|v| v.name() == name)
    }
}

impl std::fmt::Debug for RepoContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.data_sources.iter().map(|s| s.name()).collect();
        f.debug_struct("RepoContents")
            .field("data_sources", &sources)
            .field("entities", &self.entities)
            .field("feature_views", &self.feature_views)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snax_core::{Table, DUMMY_ENTITY_NAME};
    use snax_runtime::MemoryDataSource;
    use std::sync::Arc;

    #[test]
    fn test_dummy_entity_is_appended_once() {
        let game = Entity::new("game", vec!["game_id"]).unwrap();
        let contents = RepoContents::new(Vec::new(), vec![game.clone()], Vec::new());
        let names: Vec<&str> = contents.entities().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["game", DUMMY_ENTITY_NAME]);

        let again = RepoContents::new(Vec::new(), contents.entities().to_vec(), Vec::new());
        assert_eq!(again.entities().len(), 2);
    }

    #[test]
    fn test_lookups() {
        let source: DataSourceRef = Arc::new(MemoryDataSource::new("games", Table::default()));
        let view = FeatureView::new("games_view", None, None, source.clone());
        let contents = RepoContents::new(vec![source], Vec::new(), vec![view]);

        assert!(contents.get_data_source("games").is_some());
        assert!(contents.get_feature_view("games_view").is_some());
        assert_eq!(contents.get_entity(DUMMY_ENTITY_NAME), Some(&Entity::dummy()));
        assert!(contents.get_entity("game").is_none());
        assert!(contents.get_data_source("nope").is_none());
    }
}
