use crate::error::{FeastError, FeastErrorExt};
use crate::response::OnlineResponse;
use chrono::{DateTime, Utc};
use feast_domain::config::RepoConfig;
use feast_domain::{Entity, EntityKey, FeatureRef, FeatureView, Value, ValueType};
use feast_kernel::config::load_repo_config;
use feast_offline_store::{EntityFrame, HistoricalFrame, OfflineStore};
use feast_online_store::{FeatureValues, OnlineRow, OnlineStore, Progress, Provider};
use feast_registry::Registry;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// An object of a feature repository, as written in definition files (`kind: Entity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RepoObject {
    Entity(Entity),
    FeatureView(FeatureView),
}

/// Outcome of materializing one feature view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializationReport {
    pub view: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Latest source rows found in the window, one per entity key.
    pub rows_read: usize,
    /// Rows that replaced older online values.
    pub rows_written: usize,
}

#[derive(Debug)]
struct StoreInner {
    config: RepoConfig,
    registry: Registry,
    provider: Provider,
    offline: OfflineStore,
}

/// Entry point to a feature repository: definitions in the registry, batch data through the
/// offline store, low-latency lookups through the configured online provider.
///
/// Cloning is cheap.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    inner: Arc<StoreInner>,
}

impl FeatureStore {
    /// Opens the repository at `repo_path` (the directory holding `feature_store.yaml`).
    pub async fn open(repo_path: impl AsRef<Path>) -> Result<Self, FeastError> {
        let config = load_repo_config(repo_path)?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: RepoConfig) -> Result<Self, FeastError> {
        let registry = Registry::builder()
            .path(config.registry_path())
            .cache_ttl(Duration::from_secs(config.registry_cache_ttl_seconds))
            .open()
            .await?;
        let provider = Provider::from_config(&config).await?;
        let offline = OfflineStore::new(&config.repo_path);

        debug!(project = %config.project, provider = %provider.kind(), "Feature store opened");
        Ok(Self { inner: Arc::new(StoreInner { config, registry, provider, offline }) })
    }

    #[must_use]
    pub fn config(&self) -> &RepoConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.inner.config.project
    }

    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.inner.config.repo_path
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.inner.provider
    }

    /// Registers entities and feature views, then prepares online storage for the views.
    pub async fn apply(&self, objects: impl IntoIterator<Item = RepoObject>) -> Result<(), FeastError> {
        let (mut entities, mut views) = (Vec::new(), Vec::new());
        for object in objects {
            match object {
                RepoObject::Entity(entity) => entities.push(entity),
                RepoObject::FeatureView(view) => views.push(view),
            }
        }

        for entity in entities {
            self.registry().apply_entity(entity, self.project()).await?;
        }
        let mut applied = Vec::with_capacity(views.len());
        for view in views {
            applied.push(self.registry().apply_feature_view(view, self.project()).await?);
        }
        self.provider().update_infra(self.project(), &[], &applied).await?;
        Ok(())
    }

    pub async fn list_entities(&self, labels: &BTreeMap<String, String>) -> Result<Vec<Entity>, FeastError> {
        Ok(self.registry().list_entities(self.project(), labels).await?)
    }

    pub async fn get_entity(&self, name: &str) -> Result<Entity, FeastError> {
        Ok(self.registry().get_entity(name, self.project()).await?)
    }

    pub async fn list_feature_views(
        &self,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<FeatureView>, FeastError> {
        Ok(self.registry().list_feature_views(self.project(), tags).await?)
    }

    pub async fn get_feature_view(&self, name: &str) -> Result<FeatureView, FeastError> {
        Ok(self.registry().get_feature_view(name, self.project()).await?)
    }

    /// Removes a view from the registry together with its online rows.
    pub async fn delete_feature_view(&self, name: &str) -> Result<(), FeastError> {
        let view = self.get_feature_view(name).await?;
        self.provider().teardown_infra(self.project(), std::slice::from_ref(&view)).await?;
        self.registry().delete_feature_view(name, self.project()).await?;
        Ok(())
    }

    /// Loads the latest source rows in `[start, end)` into the online store.
    ///
    /// `views` selects feature views by name; `None` means every view marked `online`.
    ///
    /// # Errors
    /// [`FeastError::InvalidInterval`] unless `start < end`; a registry not-found error for an
    /// unknown view name.
    pub async fn materialize(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        views: Option<&[String]>,
    ) -> Result<Vec<MaterializationReport>, FeastError> {
        if start >= end {
            return Err(FeastError::InvalidInterval { start, end });
        }

        let views = self.views_to_materialize(views).await?;
        info!(project = self.project(), views = views.len(), %start, %end, "Materializing");

        let mut reports = Vec::with_capacity(views.len());
        for view in &views {
            reports.push(self.materialize_view(view, start, end).await?);
        }
        Ok(reports)
    }

    /// Materializes each view from where the previous run stopped up to `end`.
    ///
    /// A view without recorded runs starts at `end - ttl`, or at the Unix epoch when it has
    /// no TTL. Views already materialized up to `end` are skipped.
    pub async fn materialize_incremental(
        &self,
        end: DateTime<Utc>,
        views: Option<&[String]>,
    ) -> Result<Vec<MaterializationReport>, FeastError> {
        let views = self.views_to_materialize(views).await?;

        let mut reports = Vec::with_capacity(views.len());
        for view in &views {
            let start = view
                .most_recent_end()
                .or_else(|| view.ttl().and_then(|ttl| end.checked_sub_signed(ttl)))
                .unwrap_or(DateTime::UNIX_EPOCH);
            if start >= end {
                debug!(feature_view = %view.name, %end, "Already materialized");
                continue;
            }
            reports.push(self.materialize_view(view, start, end).await?);
        }
        Ok(reports)
    }

    async fn views_to_materialize(&self, names: Option<&[String]>) -> Result<Vec<FeatureView>, FeastError> {
        match names {
            None => Ok(self
                .list_feature_views(&BTreeMap::new())
                .await?
                .into_iter()
                .filter(|view| view.online)
                .collect()),
            Some(names) => {
                let mut views = Vec::with_capacity(names.len());
                for name in names {
                    views.push(self.get_feature_view(name).await?);
                }
                Ok(views)
            },
        }
    }

    async fn materialize_view(
        &self,
        view: &FeatureView,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MaterializationReport, FeastError> {
        let entities = self.list_entities(&BTreeMap::new()).await?;
        let rows = self
            .inner
            .offline
            .pull_latest(view, &entities, start, end)
            .await
            .context(format!("feature view '{}'", view.name))?;
        let rows_read = rows.len();

        let rows = rows
            .into_iter()
            .map(|row| OnlineRow {
                entity_key: row.entity_key,
                values: row.values,
                event_ts: row.event_ts,
                created_ts: row.created_ts,
            })
            .collect();
        let name = view.name.clone();
        let progress: &Progress = &move |processed| debug!(feature_view = %name, processed, "Chunk written");
        let rows_written =
            self.provider().online_write_batch(self.project(), view, rows, Some(progress)).await?;

        self.registry().record_materialization(&view.name, self.project(), start, end).await?;
        info!(feature_view = %view.name, rows_read, rows_written, "Materialized");

        Ok(MaterializationReport { view: view.name.clone(), start, end, rows_read, rows_written })
    }

    /// Looks up the latest online values of `feature_refs` (`"view:feature"`) for each entity
    /// row. Join key values are converted to the registered entity's type, in the lookup and in
    /// the entity columns of the response.
    ///
    /// # Errors
    /// [`FeastError::MissingEntity`] when a row lacks a join key a requested view needs.
    pub async fn get_online_features(
        &self,
        feature_refs: &[impl AsRef<str>],
        entity_rows: &[Map<String, Json>],
    ) -> Result<OnlineResponse, FeastError> {
        let refs = parse_refs(feature_refs)?;
        let views = self.resolve_views(&refs).await?;

        // View name to the stored values of each entity row.
        let mut fetched: FxHashMap<&str, Vec<Option<FeatureValues>>> = FxHashMap::default();
        // Entity rows with join key values replaced by their typed form.
        let mut typed_rows = entity_rows.to_vec();
        for view in &views {
            let join_keys = self.join_keys(view).await?;
            let keys = entity_rows
                .iter()
                .enumerate()
                .map(|(row, fields)| entity_key(row, fields, &join_keys))
                .collect::<Result<Vec<_>, _>>()?;
            for (typed, key) in typed_rows.iter_mut().zip(&keys) {
                for (join_key, value) in key.pairs() {
                    typed.insert(join_key.clone(), value.to_json());
                }
            }
            let results = self.provider().online_read(self.project(), view, &keys).await?;
            fetched.insert(&view.name, results.into_iter().map(|(_, values)| values).collect());
        }

        let mut response = OnlineResponse::from_entity_rows(&typed_rows);
        for feature_ref in &refs {
            let cells = fetched
                .get(feature_ref.view.as_str())
                .map(|rows| {
                    rows.iter()
                        .map(|values| {
                            values
                                .as_ref()
                                .and_then(|values| values.get(&feature_ref.feature))
                                .map_or(Json::Null, Value::to_json)
                        })
                        .collect()
                })
                .unwrap_or_default();
            response.push_column(feature_ref.to_string(), cells);
        }
        Ok(response)
    }

    /// Point-in-time join of the entity rows in `entity_csv` (join key columns plus
    /// `event_timestamp`) against the referenced feature views.
    pub async fn get_historical_features(
        &self,
        entity_csv: impl AsRef<Path>,
        feature_refs: &[impl AsRef<str>],
    ) -> Result<HistoricalFrame, FeastError> {
        let refs = parse_refs(feature_refs)?;
        let views = self.resolve_views(&refs).await?;
        let entity_rows = EntityFrame::from_path(entity_csv)?;
        let entities = self.list_entities(&BTreeMap::new()).await?;
        Ok(self.inner.offline.historical_features(entity_rows, &views, &entities, &refs).await?)
    }

    /// Drops every online row of the project, orphaned views included. Definitions stay in the
    /// registry.
    pub async fn teardown(&self) -> Result<(), FeastError> {
        self.provider().teardown_project(self.project()).await?;
        info!(project = self.project(), "Online infrastructure torn down");
        Ok(())
    }

    /// The distinct views named by `refs`, in order of first reference.
    async fn resolve_views(&self, refs: &[FeatureRef]) -> Result<Vec<FeatureView>, FeastError> {
        let mut views: Vec<FeatureView> = Vec::new();
        for feature_ref in refs {
            if !views.iter().any(|v| v.name == feature_ref.view) {
                views.push(self.get_feature_view(&feature_ref.view).await?);
            }
            let defined = views
                .iter()
                .any(|v| v.name == feature_ref.view && v.feature(&feature_ref.feature).is_some());
            if !defined {
                return Err(FeastError::FeatureNotFound { reference: feature_ref.to_string() });
            }
        }
        Ok(views)
    }

    async fn join_keys(&self, view: &FeatureView) -> Result<Vec<(String, ValueType)>, FeastError> {
        let mut keys = Vec::with_capacity(view.entities.len());
        for name in &view.entities {
            let entity = self.get_entity(name).await?;
            keys.push((entity.join_key, entity.value_type));
        }
        Ok(keys)
    }
}

fn parse_refs(refs: &[impl AsRef<str>]) -> Result<Vec<FeatureRef>, FeastError> {
    refs.iter().map(|r| r.as_ref().parse::<FeatureRef>().map_err(FeastError::from)).collect()
}

fn entity_key(
    row: usize,
    fields: &Map<String, Json>,
    join_keys: &[(String, ValueType)],
) -> Result<EntityKey, FeastError> {
    join_keys
        .iter()
        .map(|(join_key, value_type)| {
            let json = fields
                .get(join_key)
                .ok_or_else(|| FeastError::MissingEntity { join_key: join_key.clone(), row })?;
            let value = Value::from_json(json, *value_type).context(format!("entity row {row}"))?;
            Ok((join_key.clone(), value))
        })
        .collect()
}
