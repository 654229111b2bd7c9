//! Configuration types for FeatureStore

use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Feature store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStoreConfig {
    /// Directory holding the repository manifests
    pub repo_path: PathBuf,
}

impl FeatureStoreConfig {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Set the repository path
    pub fn with_repo_path(mut self, repo_path: impl Into<PathBuf>) -> Self {
        self.repo_path = repo_path.into();
        self
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Read a YAML config file. A relative `repo_path` resolves against the
    /// file's directory.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SdkError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_yaml(&text)?;
        if config.repo_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.repo_path = dir.join(&config.repo_path);
            }
        }
        Ok(config)
    }
}

impl Default for FeatureStoreConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
