//! # Offline Store
//!
//! Batch access to the CSV files backing feature views.
//!
//! * [`OfflineStore::pull_latest`] feeds materialization: the newest row per entity key in a
//!   time window.
//! * [`OfflineStore::historical_features`] builds training data: for every entity row, the
//!   feature values as they were at that row's `event_timestamp`.
//!
//! Source paths are resolved against the repository directory. Parsing runs on the blocking
//! pool.

mod error;
mod historical;
mod source;

pub use error::{OfflineStoreError, OfflineStoreErrorExt};
pub use historical::{EVENT_TIMESTAMP_COLUMN, EntityFrame, HistoricalFrame};
pub use source::SourceRow;

use chrono::{DateTime, Utc};
use feast_domain::{Entity, FeatureRef, FeatureView};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OfflineStore {
    repo_path: PathBuf,
}

impl OfflineStore {
    #[must_use]
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into() }
    }

    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Location of a view's source file.
    #[must_use]
    pub fn source_path(&self, view: &FeatureView) -> PathBuf {
        self.repo_path.join(&view.input.path)
    }

    /// The newest row per entity key among rows with `start <= event_ts < end`.
    ///
    /// "Newest" compares event time first and creation time second. Rows come back ordered by
    /// serialized entity key.
    ///
    /// # Errors
    /// [`OfflineStoreError::MissingColumn`] when the source lacks a timestamp, join key or
    /// feature column; [`OfflineStoreError::InvalidValue`] for cells that do not parse.
    pub async fn pull_latest(
        &self,
        view: &FeatureView,
        entities: &[Entity],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SourceRow>, OfflineStoreError> {
        let keys = source::join_keys(view, entities)?;
        let path = self.source_path(view);
        let view = view.clone();

        let rows = blocking(move || source::read_source(&path, &view, &keys, Some((start, end)))).await?;
        let read = rows.len();

        let mut latest: BTreeMap<Vec<u8>, SourceRow> = BTreeMap::new();
        for row in rows {
            let key = row.entity_key.serialize().context("Failed to serialize source key")?;
            match latest.get(&key) {
                Some(kept) if kept.recency() >= row.recency() => {},
                _ => {
                    latest.insert(key, row);
                },
            }
        }

        debug!(read, latest = latest.len(), "Pulled latest source rows");
        Ok(latest.into_values().collect())
    }

    /// Point-in-time join of `entity_rows` against the views named in `refs`.
    ///
    /// Output columns are the entity row columns followed by one `<view>__<feature>` column
    /// per reference, in reference order.
    pub async fn historical_features(
        &self,
        entity_rows: EntityFrame,
        views: &[FeatureView],
        entities: &[Entity],
        refs: &[FeatureRef],
    ) -> Result<HistoricalFrame, OfflineStoreError> {
        let repo_path = self.repo_path.clone();
        let (views, entities, refs) = (views.to_vec(), entities.to_vec(), refs.to_vec());

        let frame =
            blocking(move || historical::join(&repo_path, &entity_rows, &views, &entities, &refs)).await?;
        debug!(rows = frame.rows.len(), columns = frame.columns.len(), "Historical features joined");
        Ok(frame)
    }
}

async fn blocking<T, F>(task: F) -> Result<T, OfflineStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, OfflineStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| OfflineStoreError::Internal {
        message: e.to_string().into(),
        context: Some("Offline task failed".into()),
    })?
}
