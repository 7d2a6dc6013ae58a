use crate::error::OnlineStoreError;
use crate::row::{OnlineRow, ReadResult, StoredRow, key_digest, should_overwrite};
use crate::{CHUNK_ROWS, OnlineStore, Progress};
use feast_domain::{EntityKey, FeatureView};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

type Table = FxHashMap<[u8; 32], StoredRow>;

/// In-process online store. Contents live as long as the last clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryOnlineStore {
    tables: Arc<RwLock<FxHashMap<(String, String), Table>>>,
}

impl MemoryOnlineStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table_key(project: &str, view: &str) -> (String, String) {
        (project.to_ascii_lowercase(), view.to_owned())
    }

    fn drop_tables(&self, project: &str, tables: &[FeatureView]) {
        let mut guard = self.tables.write();
        for table in tables {
            guard.remove(&Self::table_key(project, &table.name));
        }
    }
}

impl OnlineStore for MemoryOnlineStore {
    async fn update_infra(
        &self,
        project: &str,
        tables_to_delete: &[FeatureView],
        tables_to_keep: &[FeatureView],
    ) -> Result<(), OnlineStoreError> {
        self.drop_tables(project, tables_to_delete);
        let mut guard = self.tables.write();
        for table in tables_to_keep {
            guard.entry(Self::table_key(project, &table.name)).or_default();
        }
        Ok(())
    }

    async fn teardown_infra(&self, project: &str, tables: &[FeatureView]) -> Result<(), OnlineStoreError> {
        self.drop_tables(project, tables);
        Ok(())
    }

    async fn teardown_project(&self, project: &str) -> Result<(), OnlineStoreError> {
        let project = project.to_ascii_lowercase();
        self.tables.write().retain(|(owner, _), _| *owner != project);
        Ok(())
    }

    async fn online_write_batch(
        &self,
        project: &str,
        table: &FeatureView,
        rows: Vec<OnlineRow>,
        progress: Option<&Progress>,
    ) -> Result<usize, OnlineStoreError> {
        let key = Self::table_key(project, &table.name);
        let total = rows.len();
        let mut stored = 0;

        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk = rows
                .by_ref()
                .take(CHUNK_ROWS)
                .map(|row| key_digest(&row.entity_key).map(|digest| (digest, row)))
                .collect::<Result<Vec<_>, _>>()?;
            let processed = chunk.len();

            {
                let mut guard = self.tables.write();
                let rows_by_key = guard.entry(key.clone()).or_default();
                for (digest, row) in chunk {
                    if should_overwrite(rows_by_key.get(&digest), row.event_ts, row.created_ts) {
                        rows_by_key.insert(digest, StoredRow::from(row));
                        stored += 1;
                    }
                }
            }

            if let Some(progress) = progress {
                progress(processed);
            }
        }

        debug!(project, feature_view = %table.name, total, stored, "Online batch written");
        Ok(stored)
    }

    async fn online_read(
        &self,
        project: &str,
        table: &FeatureView,
        keys: &[EntityKey],
    ) -> Result<Vec<ReadResult>, OnlineStoreError> {
        let digests = keys.iter().map(key_digest).collect::<Result<Vec<_>, _>>()?;
        let guard = self.tables.read();
        let rows_by_key = guard.get(&Self::table_key(project, &table.name));
        Ok(digests
            .iter()
            .map(|digest| {
                rows_by_key
                    .and_then(|rows| rows.get(digest))
                    .cloned()
                    .map_or((None, None), StoredRow::into_read_result)
            })
            .collect())
    }
}
