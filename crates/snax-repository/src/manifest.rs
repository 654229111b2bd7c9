//! Repository manifest files
//!
//! A manifest is a YAML document with up to three optional lists:
//!
//! ```yaml
//! data_sources:
//!   - name: nhl_games_csv
//!     type: csv
//!     path: data/game.csv
//! entities:
//!   - name: game
//!     join_keys: [game_id]
//! feature_views:
//!   - name: nhl_games_csv
//!     source: nhl_games_csv
//!     features:
//!       - { name: venue, dtype: string }
//! ```
//!
//! A repository may spread its definitions over any number of manifests.

use serde::{Deserialize, Serialize};
use snax_core::{Entity, Feature};
use snax_runtime::DataSourceConfig;
use std::collections::HashMap;

/// Contents of one manifest file, or several merged together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoManifest {
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,

    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default)]
    pub feature_views: Vec<FeatureViewManifest>,
}

/// Feature view definition. Entities and the source are referenced by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureViewManifest {
    pub name: String,

    /// Data source name
    pub source: String,

    /// Entity names; omitted means the view declares no entities
    #[serde(default)]
    pub entities: Option<Vec<String>>,

    /// Omitted means every column of the source is an untyped feature
    #[serde(default)]
    pub features: Option<Vec<Feature>>,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl RepoManifest {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is a valid, empty manifest
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Append another manifest's definitions to this one
    pub fn merge(&mut self, other: RepoManifest) {
        self.data_sources.extend(other.data_sources);
        self.entities.extend(other.entities);
        self.feature_views.extend(other.feature_views);
    }

    pub fn is_empty(&self) -> bool {
        self.data_sources.is_empty() && self.entities.is_empty() && self.feature_views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snax_core::ValueType;
    use snax_runtime::BackendConfig;

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
data_sources:
  - name: winequality_csv
    type: csv
    path: data/winequality.csv
    separator: ","
    field_mapping:
      citric_acid: citric_acidity
      pH: ph
    tags:
      owner: john.doe@gmail.com
entities:
  - name: wine
    join_keys: [wine_id]
feature_views:
  - name: winequality_acidity_csv
    source: winequality_csv
    features:
      - name: volatile_acidity
        dtype: float
      - name: ph
        dtype: FLOAT
"#;
        let manifest = RepoManifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.data_sources.len(), 1);
        assert!(matches!(
            manifest.data_sources[0].backend,
            BackendConfig::Csv { separator: ',', .. }
        ));
        assert_eq!(manifest.entities[0].join_keys(), &["wine_id".to_string()]);

        let view = &manifest.feature_views[0];
        assert_eq!(view.entities, None);
        assert_eq!(
            view.features.as_deref(),
            Some(
                &[
                    Feature::new("volatile_acidity", ValueType::Float),
                    Feature::new("ph", ValueType::Float),
                ][..]
            )
        );
    }

    #[test]
    fn test_empty_manifest() {
        assert!(RepoManifest::from_yaml("").unwrap().is_empty());
        assert!(RepoManifest::from_yaml("entities: []\n").unwrap().is_empty());
    }

    #[test]
    fn test_entity_without_join_keys_is_rejected() {
        let yaml = "entities:\n  - name: game\n    join_keys: []\n";
        assert!(RepoManifest::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut first =
            RepoManifest::from_yaml("entities:\n  - {name: a, join_keys: [x]}\n").unwrap();
        let second =
            RepoManifest::from_yaml("entities:\n  - {name: b, join_keys: [y]}\n").unwrap();
        first.merge(second);
        let names: Vec<&str> = first.entities.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
