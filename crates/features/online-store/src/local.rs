use crate::error::{OnlineStoreError, OnlineStoreErrorExt};
use crate::row::{OnlineRow, ReadResult, StoredRow, key_digest, should_overwrite};
use crate::{CHUNK_ROWS, OnlineStore, Progress};
use feast_domain::{EntityKey, FeatureView};
use feast_storage::{Compression, NamespacedStorage, Storage, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};

const STRIPES: usize = 64;

#[derive(Debug)]
struct LocalInner {
    storage: Storage,
    stripes: Vec<Mutex<()>>,
}

/// File-backed online store.
///
/// Each project is a storage namespace; a row lives at `<view>/<sha256 of entity key>`, sharded
/// by the storage engine and LZ4-compressed. Writers to the same key within the process are
/// serialized through a fixed set of lock stripes.
#[derive(Debug, Clone)]
pub struct LocalOnlineStore {
    inner: Arc<LocalInner>,
}

impl LocalOnlineStore {
    /// Opens (and creates) the store rooted at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, OnlineStoreError> {
        let path = path.into();
        let storage = Storage::builder()
            .root(&path)
            .compression(Compression::Lz4)
            .connect()
            .await
            .context(format!("Failed to open online store at {}", path.display()))?;

        let stripes = (0..STRIPES).map(|_| Mutex::new(())).collect();
        Ok(Self { inner: Arc::new(LocalInner { storage, stripes }) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.storage.root()
    }

    fn project(&self, project: &str) -> Result<NamespacedStorage, OnlineStoreError> {
        self.inner.storage.namespace(project).context("Invalid project name")
    }

    fn row_path(view: &str, digest: &[u8; 32]) -> String {
        format!("{view}/{}", hex::encode(digest))
    }

    async fn read_row(
        ns: &NamespacedStorage,
        path: &str,
    ) -> Result<Option<StoredRow>, OnlineStoreError> {
        match ns.read(path).await {
            Ok(bytes) => StoredRow::decode(&bytes).map(Some),
            Err(StorageError::FileNotFound { .. }) => Ok(None),
            Err(err) => Err(OnlineStoreError::Storage {
                source: err,
                context: Some(format!("Failed to read row {path}").into()),
            }),
        }
    }

    /// Applies one chunk sequentially. Returns the number of rows stored.
    async fn write_chunk(
        &self,
        ns: &NamespacedStorage,
        view: &str,
        rows: Vec<OnlineRow>,
    ) -> Result<usize, OnlineStoreError> {
        let mut stored = 0;
        for row in rows {
            let digest = key_digest(&row.entity_key)?;
            let path = Self::row_path(view, &digest);

            let _guard = self.inner.stripes[fxhash::hash(&digest) % STRIPES].lock().await;
            let existing = Self::read_row(ns, &path).await?;
            if !should_overwrite(existing.as_ref(), row.event_ts, row.created_ts) {
                continue;
            }

            let bytes = StoredRow::from(row).encode()?;
            ns.write(&path, &bytes).await.context(format!("Failed to write row {path}"))?;
            stored += 1;
        }
        Ok(stored)
    }

    async fn drop_tables(&self, project: &str, tables: &[FeatureView]) -> Result<(), OnlineStoreError> {
        let ns = self.project(project)?;
        for table in tables {
            let removed = ns
                .remove_dir(&table.name)
                .await
                .context(format!("Failed to remove rows of {}", table.name))?;
            if removed {
                info!(project, feature_view = %table.name, "Removed online rows");
            }
        }
        Ok(())
    }
}

impl OnlineStore for LocalOnlineStore {
    async fn update_infra(
        &self,
        project: &str,
        tables_to_delete: &[FeatureView],
        tables_to_keep: &[FeatureView],
    ) -> Result<(), OnlineStoreError> {
        self.drop_tables(project, tables_to_delete).await?;
        // Row directories appear on first write; kept tables only need a valid namespace.
        self.project(project)?;
        debug!(project, kept = tables_to_keep.len(), deleted = tables_to_delete.len(), "Online infra updated");
        Ok(())
    }

    async fn teardown_infra(&self, project: &str, tables: &[FeatureView]) -> Result<(), OnlineStoreError> {
        self.drop_tables(project, tables).await
    }

    async fn teardown_project(&self, project: &str) -> Result<(), OnlineStoreError> {
        let removed = self
            .inner
            .storage
            .remove_namespace(project)
            .await
            .context(format!("Failed to remove online rows of project {project}"))?;
        if removed {
            info!(project, "Removed online project");
        }
        Ok(())
    }

    async fn online_write_batch(
        &self,
        project: &str,
        table: &FeatureView,
        rows: Vec<OnlineRow>,
        progress: Option<&Progress>,
    ) -> Result<usize, OnlineStoreError> {
        let ns = self.project(project)?;
        let total = rows.len();

        let mut tasks = JoinSet::new();
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<OnlineRow> = rows.by_ref().take(CHUNK_ROWS).collect();
            let (store, ns, view) = (self.clone(), ns.clone(), table.name.clone());
            tasks.spawn(async move {
                let len = chunk.len();
                store.write_chunk(&ns, &view, chunk).await.map(|stored| (len, stored))
            });
        }

        let mut stored = 0;
        while let Some(joined) = tasks.join_next().await {
            let (processed, written) = joined.map_err(|e| OnlineStoreError::Internal {
                message: e.to_string().into(),
                context: Some("Online write task failed".into()),
            })??;
            stored += written;
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
        let ns = self.project(project)?;
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let path = Self::row_path(&table.name, &key_digest(key)?);
            results.push(Self::read_row(&ns, &path).await?.map_or((None, None), StoredRow::into_read_result));
        }
        Ok(results)
    }
}
