use crate::error::OnlineStoreError;
use crate::row::{OnlineRow, ReadResult};
use crate::{LocalOnlineStore, MemoryOnlineStore, OnlineStore, Progress};
use feast_domain::config::{ProviderKind, RepoConfig};
use feast_domain::{EntityKey, FeatureView};
use tracing::debug;

/// The online store selected by `provider` in `feature_store.yaml`.
#[derive(Debug, Clone)]
pub enum Provider {
    Local(LocalOnlineStore),
    Memory(MemoryOnlineStore),
}

impl Provider {
    pub async fn from_config(config: &RepoConfig) -> Result<Self, OnlineStoreError> {
        let provider = match config.provider {
            ProviderKind::Local => Self::Local(LocalOnlineStore::open(config.online_store_path()).await?),
            ProviderKind::Memory => Self::Memory(MemoryOnlineStore::new()),
        };
        debug!(provider = %provider.kind(), "Online provider ready");
        Ok(provider)
    }

    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Local(_) => ProviderKind::Local,
            Self::Memory(_) => ProviderKind::Memory,
        }
    }
}

impl OnlineStore for Provider {
    async fn update_infra(
        &self,
        project: &str,
        tables_to_delete: &[FeatureView],
        tables_to_keep: &[FeatureView],
    ) -> Result<(), OnlineStoreError> {
        match self {
            Self::Local(store) => store.update_infra(project, tables_to_delete, tables_to_keep).await,
            Self::Memory(store) => store.update_infra(project, tables_to_delete, tables_to_keep).await,
        }
    }

    async fn teardown_infra(&self, project: &str, tables: &[FeatureView]) -> Result<(), OnlineStoreError> {
        match self {
            Self::Local(store) => store.teardown_infra(project, tables).await,
            Self::Memory(store) => store.teardown_infra(project, tables).await,
        }
    }

    async fn teardown_project(&self, project: &str) -> Result<(), OnlineStoreError> {
        match self {
            Self::Local(store) => store.teardown_project(project).await,
            Self::Memory(store) => store.teardown_project(project).await,
        }
    }

    async fn online_write_batch(
        &self,
        project: &str,
        table: &FeatureView,
        rows: Vec<OnlineRow>,
        progress: Option<&Progress>,
    ) -> Result<usize, OnlineStoreError> {
        match self {
            Self::Local(store) => store.online_write_batch(project, table, rows, progress).await,
            Self::Memory(store) => store.online_write_batch(project, table, rows, progress).await,
        }
    }

    async fn online_read(
        &self,
        project: &str,
        table: &FeatureView,
        keys: &[EntityKey],
    ) -> Result<Vec<ReadResult>, OnlineStoreError> {
        match self {
            Self::Local(store) => store.online_read(project, table, keys).await,
            Self::Memory(store) => store.online_read(project, table, keys).await,
        }
    }
}
