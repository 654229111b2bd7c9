//! Feature repository loader
//!
//! Loads every manifest under a repository directory, checks the definitions
//! against each other and builds the data sources and feature views they
//! describe.

use crate::contents::RepoContents;
use crate::error::{RepositoryError, RepositoryResult};
use crate::manifest::{FeatureViewManifest, RepoManifest};
use futures::future::try_join_all;
use path_absolutize::Absolutize;
use snax_core::Entity;
use snax_runtime::{DataSourceRef, FeatureView};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;

/// Loads a repository from a directory of YAML manifests.
///
/// # Example
///
/// ```no_run
/// use snax_repository::RepoLoader;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let contents = RepoLoader::new("feature_repo")?.load().await?;
///     for view in contents.feature_views() {
///         println!("{}", view.name());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RepoLoader {
    root_path: PathBuf,
}

impl RepoLoader {
    /// Create a loader for `root_path`, which must be an existing directory
    pub fn new<P: AsRef<Path>>(root_path: P) -> RepositoryResult<Self> {
        let path = root_path.as_ref();
        if !path.is_dir() {
            return Err(RepositoryError::InvalidPath {
                path: path.to_path_buf(),
            });
        }
        let root_path = path
            .absolutize()
            .map_err(|source| RepositoryError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .to_path_buf();
        Ok(Self { root_path })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// All manifest files under the root, in sorted path order
    pub async fn manifest_files(&self) -> RepositoryResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_yaml_files(&self.root_path, &mut files).await?;
        files.sort();
        tracing::debug!(
            "Found {} manifest(s) under {}",
            files.len(),
            self.root_path.display()
        );
        Ok(files)
    }

    /// Read and merge every manifest without building anything
    pub async fn load_manifest(&self) -> RepositoryResult<RepoManifest> {
        let mut merged = RepoManifest::default();
        for path in self.manifest_files().await? {
            let text = fs::read_to_string(&path)
                .await
                .map_err(|source| RepositoryError::Io {
                    path: path.clone(),
                    source,
                })?;
            let manifest = RepoManifest::from_yaml(&text)
                .map_err(|source| RepositoryError::YamlParse { path, source })?;
            merged.merge(manifest);
        }
        Ok(merged)
    }

    /// Load, validate and build the repository
    pub async fn load(&self) -> RepositoryResult<RepoContents> {
        let manifest = self.load_manifest().await?;
        validate(&manifest)?;

        let sources = try_join_all(
            manifest
                .data_sources
                .iter()
                .map(|config| config.build(Some(self.root_path.as_path()))),
        )
        .await?;
        let by_name: HashMap<&str, &DataSourceRef> = manifest
            .data_sources
            .iter()
            .map(|c| c.name.as_str())
            .zip(sources.iter())
            .collect();

        let feature_views = manifest
            .feature_views
            .iter()
            .map(|view| build_view(view, &by_name, &manifest.entities))
            .collect::<RepositoryResult<Vec<_>>>()?;

        tracing::info!(
            "Loaded repository {}: {} data source(s), {} entity(ies), {} feature view(s)",
            self.root_path.display(),
            sources.len(),
            manifest.entities.len(),
            feature_views.len()
        );
        Ok(RepoContents::new(sources, manifest.entities, feature_views))
    }
}

/// Load the repository at `repo_path`
pub async fn parse_repo<P: AsRef<Path>>(repo_path: P) -> RepositoryResult<RepoContents> {
    RepoLoader::new(repo_path)?.load().await
}

fn collect_yaml_files<'a>(
    dir: &'a Path,
    files: &'a mut Vec<PathBuf>,
) -> Pin<Box<dyn Future<Output = RepositoryResult<()>> + Send + 'a>> {
    Box::pin(async move {
        let io_error = |source| RepositoryError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = fs::read_dir(dir).await.map_err(io_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.is_dir() {
                collect_yaml_files(&path, files).await?;
            } else if matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("yaml") | Some("yml")
            ) {
                files.push(path);
            }
        }
        Ok(())
    })
}

fn check_unique<'a>(
    kind: &'static str,
    names: impl IntoIterator<Item = &'a str>,
) -> RepositoryResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(RepositoryError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn validate(manifest: &RepoManifest) -> RepositoryResult<()> {
    check_unique("data source", manifest.data_sources.iter().map(|s| s.name.as_str()))?;
    // The dummy entity is implicit, so defining it again is a duplicate
    check_unique(
        "entity",
        manifest
            .entities
            .iter()
            .map(|e| e.name())
            .chain(std::iter::once(snax_core::DUMMY_ENTITY_NAME)),
    )?;
    check_unique("feature view", manifest.feature_views.iter().map(|v| v.name.as_str()))?;

    for view in &manifest.feature_views {
        if !manifest.data_sources.iter().any(|s| s.name == view.source) {
            return Err(RepositoryError::UnknownReference {
                view: view.name.clone(),
                kind: "data source",
                name: view.source.clone(),
            });
        }
        for entity in view.entities.iter().flatten() {
            if !manifest.entities.iter().any(|e| e.name() == entity) {
                return Err(RepositoryError::UnknownReference {
                    view: view.name.clone(),
                    kind: "entity",
                    name: entity.clone(),
                });
            }
        }
    }
    Ok(())
}

fn build_view(
    view: &FeatureViewManifest,
    sources: &HashMap<&str, &DataSourceRef>,
    entities: &[Entity],
) -> RepositoryResult<FeatureView> {
    let source = sources
        .get(view.source.as_str())
        .map(|s| (*s).clone())
        .ok_or_else(|| RepositoryError::UnknownReference {
            view: view.name.clone(),
            kind: "data source",
            name: view.source.clone(),
        })?;
    let view_entities = view
        .entities
        .as_ref()
        .map(|names| {
            names
                .iter()
                .map(|name| {
                    entities
                        .iter()
                        .find(|e| e.name() == name)
                        .cloned()
                        .ok_or_else(|| RepositoryError::UnknownReference {
                            view: view.name.clone(),
                            kind: "entity",
                            name: name.clone(),
                        })
                })
                .collect::<RepositoryResult<Vec<_>>>()
        })
        .transpose()?;

    Ok(
        FeatureView::new(view.name.clone(), view_entities, view.features.clone(), source)
            .with_tags(view.tags.clone()),
    )
}
