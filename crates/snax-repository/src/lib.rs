//! snax repository - feature repository discovery
//!
//! A feature repository is a directory of YAML manifests declaring data
//! sources, entities and feature views. This crate loads such a directory into
//! [`RepoContents`], building every data source and resolving the references
//! between definitions.
//!
//! # Quick Start
//!
//! ```no_run
//! use snax_repository::parse_repo;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let contents = parse_repo("sports_feature_repo").await?;
//!     if let Some(game) = contents.get_entity("game") {
//!         println!("game is keyed by {:?}", game.join_keys());
//!     }
//!     Ok(())
//! }
//! ```

pub mod contents;
pub mod error;
pub mod loader;
pub mod manifest;

pub use contents::RepoContents;
pub use error::{RepositoryError, RepositoryResult};
pub use loader::{parse_repo, RepoLoader};
pub use manifest::{FeatureViewManifest, RepoManifest};
