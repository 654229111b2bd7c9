//! snax feature store SDK
//!
//! High-level API over a feature repository: open a repository directory,
//! browse its feature views, entities and data sources, and add features to
//! a table by `feature_view:feature` reference.
//!
//! ```no_run
//! use snax_core::{Table, Value};
//! use snax_sdk::{FeatureStore, FeatureStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = FeatureStore::open(FeatureStoreConfig::new("sports_feature_repo")).await?;
//!     let games = Table::from_rows(vec!["game_id"], vec![vec![Value::Int(2017020001)]])?;
//!     let enriched = store
//!         .add_features_to_dataframe(&games, &["nhl_games_csv:outcome"], Some("game"))
//!         .await?;
//!     println!("{:?}", enriched);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod feature_store;

// Re-export main types
pub use config::FeatureStoreConfig;
pub use error::{Result, SdkError};
pub use feature_store::FeatureStore;

// Re-export commonly used types from dependencies
pub use snax_core::{Entity, Feature, IfExists, Table, Value, ValueType};
pub use snax_repository::RepoContents;
pub use snax_runtime::{DataSource, DataSourceRef, FeatureView, Select};
