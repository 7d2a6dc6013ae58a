//! # Registry
//!
//! The catalog of feature definitions. Every project, entity and feature view lives in one
//! registry file (postcard, LZ4-compressed, written atomically through `feast-storage`).
//!
//! Reads are served from a TTL cache (`registry_cache_ttl_seconds`); mutations reload the file,
//! apply the change, bump `version` and `last_updated`, persist and refresh the cache. Within a
//! process mutations are serialized.
//!
//! ```rust
//! use feast_domain::{Entity, ValueType};
//! use feast_registry::{Registry, RegistryError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RegistryError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let registry = Registry::builder().path(tmp.path().join("metadata.db")).open().await?;
//!
//!     registry.apply_entity(Entity::new("driver_id", ValueType::Int64), "driver_ranking").await?;
//!     let entity = registry.get_entity("driver_id", "driver_ranking").await?;
//!     assert_eq!(entity.join_key, "driver_id");
//!     Ok(())
//! }
//! ```

mod builder;
mod error;
mod snapshot;

pub use builder::RegistryBuilder;
pub use error::{RegistryError, RegistryErrorExt};
pub use snapshot::{ProjectRecord, RegistrySnapshot};

use chrono::{DateTime, Utc};
use feast_domain::labels::matches_labels;
use feast_domain::names::validate_name;
use feast_domain::{Entity, FeatureView, MaterializationInterval};
use feast_storage::{Storage, StorageError};
use moka::sync::Cache;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug)]
pub struct RegistryInner {
    storage: Storage,
    /// File name of the registry below the storage root.
    file_name: PathBuf,
    path: PathBuf,
    cache: Option<Cache<(), Arc<RegistrySnapshot>>>,
    write_lock: Mutex<()>,
}

/// Thread-safe handle to a registry file. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Deref for Registry {
    type Target = RegistryInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Registry {
    #[must_use = "The registry is not opened until you call .open()"]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Location of the registry file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current registry contents. A missing registry file reads as an empty registry.
    pub async fn snapshot(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&())) {
            return Ok(cached);
        }

        let snapshot = Arc::new(self.load().await?);
        if let Some(cache) = &self.cache {
            cache.insert((), Arc::clone(&snapshot));
        }
        Ok(snapshot)
    }

    /// Drops the cached snapshot so the next read goes to disk.
    pub fn refresh(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&());
        }
    }

    // --- Entities ---

    /// Registers or replaces an entity. Creation time survives updates.
    pub async fn apply_entity(&self, entity: Entity, project: &str) -> Result<Entity, RegistryError> {
        let mut entity = entity.normalized().context("apply_entity")?;
        self.mutate(project, |record, now| {
            let existing = record.entities.get(&entity.name);
            entity.created_timestamp =
                existing.and_then(|e| e.created_timestamp).or(Some(now));
            entity.last_updated_timestamp = Some(now);
            record.entities.insert(entity.name.clone(), entity.clone());
            Ok(entity)
        })
        .await
        .inspect(|e| info!(project, entity = %e.name, "Applied entity"))
    }

    pub async fn get_entity(&self, name: &str, project: &str) -> Result<Entity, RegistryError> {
        let snapshot = self.snapshot().await?;
        snapshot
            .project(project)
            .and_then(|record| record.entities.get(name))
            .cloned()
            .ok_or_else(|| RegistryError::EntityNotFound {
                name: name.to_owned(),
                project: project.to_owned(),
            })
    }

    /// Entities of `project` carrying every label in `labels`, sorted by name.
    pub async fn list_entities(
        &self,
        project: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<Entity>, RegistryError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot
            .project(project)
            .map(|record| {
                record.entities.values().filter(|e| matches_labels(&e.labels, labels)).cloned().collect()
            })
            .unwrap_or_default())
    }

    pub async fn delete_entity(&self, name: &str, project: &str) -> Result<(), RegistryError> {
        self.mutate(project, |record, _| {
            record.entities.remove(name).map(|_| ()).ok_or_else(|| RegistryError::EntityNotFound {
                name: name.to_owned(),
                project: project.to_owned(),
            })
        })
        .await?;
        info!(project, entity = name, "Deleted entity");
        Ok(())
    }

    // --- Feature views ---

    /// Registers or replaces a feature view.
    ///
    /// Materialized intervals and the creation time of an existing view are kept. Entities the
    /// view references do not have to be registered yet.
    pub async fn apply_feature_view(
        &self,
        view: FeatureView,
        project: &str,
    ) -> Result<FeatureView, RegistryError> {
        let mut view = view.normalized().context("apply_feature_view")?;
        self.mutate(project, |record, now| {
            match record.feature_views.get(&view.name) {
                Some(existing) => {
                    view.created_timestamp = existing.created_timestamp.or(Some(now));
                    view.materialization_intervals.clone_from(&existing.materialization_intervals);
                },
                None => view.created_timestamp = Some(now),
            }
            view.last_updated_timestamp = Some(now);
            record.feature_views.insert(view.name.clone(), view.clone());
            Ok(view)
        })
        .await
        .inspect(|v| info!(project, feature_view = %v.name, "Applied feature view"))
    }

    pub async fn get_feature_view(
        &self,
        name: &str,
        project: &str,
    ) -> Result<FeatureView, RegistryError> {
        let snapshot = self.snapshot().await?;
        snapshot
            .project(project)
            .and_then(|record| record.feature_views.get(name))
            .cloned()
            .ok_or_else(|| RegistryError::FeatureViewNotFound {
                name: name.to_owned(),
                project: project.to_owned(),
            })
    }

    /// Feature views of `project` whose tags carry every pair in `tags`, sorted by name.
    pub async fn list_feature_views(
        &self,
        project: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<FeatureView>, RegistryError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot
            .project(project)
            .map(|record| {
                record.feature_views.values().filter(|v| matches_labels(&v.tags, tags)).cloned().collect()
            })
            .unwrap_or_default())
    }

    pub async fn delete_feature_view(&self, name: &str, project: &str) -> Result<(), RegistryError> {
        self.mutate(project, |record, _| {
            record.feature_views.remove(name).map(|_| ()).ok_or_else(|| {
                RegistryError::FeatureViewNotFound { name: name.to_owned(), project: project.to_owned() }
            })
        })
        .await?;
        info!(project, feature_view = name, "Deleted feature view");
        Ok(())
    }

    /// Appends a materialized `[start, end)` window to a view.
    pub async fn record_materialization(
        &self,
        name: &str,
        project: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FeatureView, RegistryError> {
        self.mutate(project, |record, now| {
            let view = record.feature_views.get_mut(name).ok_or_else(|| {
                RegistryError::FeatureViewNotFound { name: name.to_owned(), project: project.to_owned() }
            })?;
            view.materialization_intervals.push(MaterializationInterval { start, end });
            view.last_updated_timestamp = Some(now);
            Ok(view.clone())
        })
        .await
    }

    // --- Projects ---

    /// Creates an empty project.
    ///
    /// # Errors
    /// [`RegistryError::ProjectExists`] if the name is taken, archived projects included.
    pub async fn create_project(&self, name: &str) -> Result<(), RegistryError> {
        validate_name("project", name).context("create_project")?;
        self.mutate_snapshot(|snapshot, now| {
            if snapshot.projects.contains_key(name) {
                return Err(RegistryError::ProjectExists { name: name.to_owned() });
            }
            snapshot.projects.insert(name.to_owned(), ProjectRecord::new(name, now));
            Ok(())
        })
        .await?;
        info!(project = name, "Created project");
        Ok(())
    }

    /// Archives a project; its objects stay in the registry but it no longer accepts changes.
    pub async fn archive_project(&self, name: &str) -> Result<(), RegistryError> {
        self.mutate_snapshot(|snapshot, _| {
            let record = snapshot
                .projects
                .get_mut(name)
                .filter(|record| !record.archived)
                .ok_or_else(|| RegistryError::ProjectNotFound { name: name.to_owned() })?;
            record.archived = true;
            Ok(())
        })
        .await?;
        info!(project = name, "Archived project");
        Ok(())
    }

    /// Names of all active projects, sorted.
    pub async fn list_projects(&self) -> Result<Vec<String>, RegistryError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.projects.values().filter(|p| !p.archived).map(|p| p.name.clone()).collect())
    }

    /// Deletes the registry file.
    pub async fn teardown(&self) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;
        match self.storage.delete(&self.file_name).await {
            Ok(()) | Err(StorageError::FileNotFound { .. }) => {},
            Err(err) => return Err(err.into()),
        }
        self.refresh();
        info!(path = %self.path.display(), "Registry removed");
        Ok(())
    }

    // --- internals ---

    async fn load(&self) -> Result<RegistrySnapshot, RegistryError> {
        match self.storage.read(&self.file_name).await {
            Ok(bytes) => RegistrySnapshot::decode_bin(&bytes),
            Err(StorageError::FileNotFound { .. }) => {
                debug!(path = %self.path.display(), "Registry file absent, starting empty");
                Ok(RegistrySnapshot::default())
            },
            Err(err) => Err(RegistryError::Storage {
                source: err,
                context: Some(format!("Failed to read {}", self.path.display()).into()),
            }),
        }
    }

    /// Project-scoped read-modify-write. Creates the project on first use and rejects archived
    /// projects.
    async fn mutate<T>(
        &self,
        project: &str,
        apply: impl FnOnce(&mut ProjectRecord, DateTime<Utc>) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        validate_name("project", project).context("project")?;
        self.mutate_snapshot(|snapshot, now| {
            let record = snapshot
                .projects
                .entry(project.to_owned())
                .or_insert_with(|| ProjectRecord::new(project, now));
            if record.archived {
                return Err(RegistryError::ProjectArchived { name: project.to_owned() });
            }
            apply(record, now)
        })
        .await
    }

    async fn mutate_snapshot<T>(
        &self,
        apply: impl FnOnce(&mut RegistrySnapshot, DateTime<Utc>) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.load().await?;
        let now = Utc::now();
        let out = apply(&mut snapshot, now)?;
        snapshot.touch(now);

        let bytes = snapshot.encode_bin()?;
        self.storage
            .write(&self.file_name, &bytes)
            .await
            .context(format!("Failed to write {}", self.path.display()))?;

        debug!(version = snapshot.version, bytes = bytes.len(), "Registry committed");
        if let Some(cache) = &self.cache {
            cache.insert((), Arc::new(snapshot));
        }
        Ok(out)
    }
}
