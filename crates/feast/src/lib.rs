//! # Feast
//!
//! A local feature store. [`FeatureStore`] ties together the pieces of a feature repository:
//!
//! * the registry (`feast-registry`) holding entity and feature view definitions,
//! * the offline store (`feast-offline-store`) reading CSV sources for materialization and
//!   point-in-time joins,
//! * the online provider (`feast-online-store`) serving the latest values per entity.
//!
//! [`repo`] holds the repository-level operations behind `feast apply`, `feast teardown` and
//! `feast init`.
//!
//! ```rust,no_run
//! use feast::FeatureStore;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), feast::FeastError> {
//! let store = FeatureStore::open("feature_repo").await?;
//! let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_value(json!([{ "driver_id": 1001 }])).unwrap();
//! let response = store.get_online_features(&["driver_hourly_stats:conv_rate"], &rows).await?;
//! println!("{:?}", response.to_dict());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod repo;
mod response;
mod store;
pub mod testing;

pub use error::{FeastError, FeastErrorExt};
pub use response::OnlineResponse;
pub use store::{FeatureStore, MaterializationReport, RepoObject};

pub use feast_domain as domain;
pub use feast_kernel as kernel;
pub use feast_offline_store as offline;
pub use feast_online_store as online;
pub use feast_registry as registry;
