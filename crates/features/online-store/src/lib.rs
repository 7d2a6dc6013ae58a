//! # Online Store
//!
//! Keeps the latest feature values per `(project, feature view, entity key)` for low-latency
//! lookups. Rows are addressed by the SHA-256 of the entity key's canonical serialization.
//!
//! A write only replaces a stored row when it is newer: a later event time, or the same event
//! time with a later creation time. Out-of-order materializations therefore never roll a key
//! back.
//!
//! ```rust
//! use chrono::Utc;
//! use feast_domain::{EntityKey, FeatureView, FileSource, Value};
//! use feast_online_store::{MemoryOnlineStore, OnlineRow, OnlineStore, OnlineStoreError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), OnlineStoreError> {
//!     let store = MemoryOnlineStore::new();
//!     let source = FileSource::csv("data/driver_stats.csv", "datetime");
//!     let view = FeatureView::new("driver_hourly_stats", vec!["driver_id".to_owned()], vec![], source);
//!     let key = EntityKey::single("driver_id", Value::Int64(1001));
//!
//!     let row = OnlineRow {
//!         entity_key: key.clone(),
//!         values: [("conv_rate".to_owned(), Value::Float(0.5))].into(),
//!         event_ts: Utc::now(),
//!         created_ts: None,
//!     };
//!     store.online_write_batch("driver_ranking", &view, vec![row], None).await?;
//!
//!     let read = store.online_read("driver_ranking", &view, &[key]).await?;
//!     assert!(read[0].1.is_some());
//!     Ok(())
//! }
//! ```

mod error;
mod local;
mod memory;
mod provider;
mod row;

pub use error::{OnlineStoreError, OnlineStoreErrorExt};
pub use local::LocalOnlineStore;
pub use memory::MemoryOnlineStore;
pub use provider::Provider;
pub use row::{FeatureValues, OnlineRow, ReadResult};

use feast_domain::{EntityKey, FeatureView};
use std::future::Future;

/// Progress callback of [`OnlineStore::online_write_batch`], called with the number of rows
/// processed by each finished chunk.
pub type Progress = dyn Fn(usize) + Send + Sync;

/// Rows handled per write chunk.
pub(crate) const CHUNK_ROWS: usize = 256;

pub trait OnlineStore: Send + Sync {
    /// Drops the stored rows of `tables_to_delete` and prepares `tables_to_keep`.
    fn update_infra(
        &self,
        project: &str,
        tables_to_delete: &[FeatureView],
        tables_to_keep: &[FeatureView],
    ) -> impl Future<Output = Result<(), OnlineStoreError>> + Send;

    /// Drops the stored rows of `tables`.
    fn teardown_infra(
        &self,
        project: &str,
        tables: &[FeatureView],
    ) -> impl Future<Output = Result<(), OnlineStoreError>> + Send;

    /// Drops every stored row of `project`, including rows of views no longer registered.
    fn teardown_project(&self, project: &str) -> impl Future<Output = Result<(), OnlineStoreError>> + Send;

    /// Writes `rows` into `table`, applying the newer-wins rule per key.
    ///
    /// Returns how many rows were stored; rows losing to an existing newer row are skipped.
    fn online_write_batch(
        &self,
        project: &str,
        table: &FeatureView,
        rows: Vec<OnlineRow>,
        progress: Option<&Progress>,
    ) -> impl Future<Output = Result<usize, OnlineStoreError>> + Send;

    /// One result per key, in the order of `keys`. Unknown keys read as `(None, None)`.
    fn online_read(
        &self,
        project: &str,
        table: &FeatureView,
        keys: &[EntityKey],
    ) -> impl Future<Output = Result<Vec<ReadResult>, OnlineStoreError>> + Send;
}
