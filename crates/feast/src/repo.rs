//! Operations on a feature repository directory: `feature_store.yaml` plus YAML definition
//! files and the CSV data they point at.

use crate::error::{FeastError, FeastErrorExt};
use crate::store::{FeatureStore, RepoObject};
use crate::testing::driver_data;
use chrono::{Duration, DurationRound, Utc};
use feast_domain::config::RepoConfig;
use feast_domain::names::sanitize_name;
use feast_domain::{Entity, FeatureView};
use feast_kernel::config::{ConfigError, FEATURE_STORE_YAML};
use feast_online_store::OnlineStore;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Definition file written by [`init_repo`].
pub const EXAMPLE_FILE: &str = "example.yaml";
/// Sample data written by [`init_repo`], relative to the repository.
pub const DRIVER_STATS_CSV: &str = "data/driver_stats.csv";
/// Drivers in the sample data.
pub const EXAMPLE_DRIVERS: [i64; 5] = [1001, 1002, 1003, 1004, 1005];

const EXAMPLE_DEFINITIONS: &str = "\
kind: Entity
name: driver_id
value_type: INT64
description: driver id
---
kind: FeatureView
name: driver_hourly_stats
entities:
  - driver_id
ttl: 86400
features:
  - name: conv_rate
    dtype: FLOAT
  - name: acc_rate
    dtype: FLOAT
  - name: avg_daily_trips
    dtype: INT64
input:
  path: data/driver_stats.csv
  event_timestamp_column: datetime
  created_timestamp_column: created
online: true
";

/// Definitions found in a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoContents {
    pub entities: Vec<Entity>,
    pub feature_views: Vec<FeatureView>,
}

impl RepoContents {
    fn push(&mut self, object: RepoObject, path: &Path) -> Result<(), FeastError> {
        let duplicate = |kind, name: &str| FeastError::DuplicateObject {
            kind,
            name: name.to_owned(),
            path: path.to_path_buf(),
        };
        match object {
            RepoObject::Entity(entity) => {
                if self.entities.iter().any(|e| e.name == entity.name) {
                    return Err(duplicate("entity", &entity.name));
                }
                self.entities.push(entity);
            },
            RepoObject::FeatureView(view) => {
                if self.feature_views.iter().any(|v| v.name == view.name) {
                    return Err(duplicate("feature view", &view.name));
                }
                self.feature_views.push(view);
            },
        }
        Ok(())
    }
}

/// What [`apply_total`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub entities: Vec<String>,
    pub feature_views: Vec<String>,
    pub deleted_feature_views: Vec<String>,
}

/// # Errors
/// [`ConfigError::RepoNotFound`] (wrapped) when `repo_path` has no `feature_store.yaml`.
pub fn check_repo(repo_path: impl AsRef<Path>) -> Result<(), FeastError> {
    let repo_path = repo_path.as_ref();
    if repo_path.join(FEATURE_STORE_YAML).is_file() {
        Ok(())
    } else {
        Err(ConfigError::RepoNotFound { path: repo_path.to_path_buf() }.into())
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.depth() > 0
        && entry.file_type().is_dir()
        && (name.starts_with('.') || (entry.depth() == 1 && name == "data"))
}

fn is_definition_file(entry: &DirEntry) -> bool {
    let path = entry.path();
    entry.file_type().is_file()
        && entry.file_name() != FEATURE_STORE_YAML
        && path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Collects the definitions of every `*.yaml`/`*.yml` file below `repo_path` except
/// `feature_store.yaml`, skipping hidden directories and the top-level `data/`.
///
/// A file may hold several YAML documents; each is an object tagged with `kind`.
pub fn parse_repo(repo_path: impl AsRef<Path>) -> Result<RepoContents, FeastError> {
    let mut contents = RepoContents::default();

    let files = WalkDir::new(repo_path.as_ref())
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry))
        .flatten()
        .filter(is_definition_file);

    for file in files {
        let path = file.path();
        let text = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        for document in serde_yaml::Deserializer::from_str(&text) {
            let object = RepoObject::deserialize(document).context(path.display().to_string())?;
            contents.push(object, path)?;
        }
        debug!(file = %path.display(), "Parsed definitions");
    }

    Ok(contents)
}

/// Makes the registry match the repository: applies every entity and feature view found,
/// deletes registered views that are gone, and updates online infrastructure accordingly.
pub async fn apply_total(config: &RepoConfig, repo_path: impl AsRef<Path>) -> Result<ApplySummary, FeastError> {
    let contents = parse_repo(repo_path)?;
    let store = FeatureStore::from_config(config.clone()).await?;
    let (registry, project) = (store.registry(), store.project());
    let mut summary = ApplySummary::default();

    for entity in contents.entities {
        let entity = registry.apply_entity(entity, project).await?;
        summary.entities.push(entity.name);
    }

    let to_delete: Vec<FeatureView> = registry
        .list_feature_views(project, &BTreeMap::new())
        .await?
        .into_iter()
        .filter(|existing| !contents.feature_views.iter().any(|v| v.name == existing.name))
        .collect();
    for view in &to_delete {
        registry.delete_feature_view(&view.name, project).await?;
        summary.deleted_feature_views.push(view.name.clone());
    }

    let mut to_keep = Vec::with_capacity(contents.feature_views.len());
    for view in contents.feature_views {
        let view = registry.apply_feature_view(view, project).await?;
        summary.feature_views.push(view.name.clone());
        to_keep.push(view);
    }

    store.provider().update_infra(project, &to_delete, &to_keep).await?;
    info!(
        project,
        entities = summary.entities.len(),
        feature_views = summary.feature_views.len(),
        deleted = summary.deleted_feature_views.len(),
        "Repository applied"
    );
    Ok(summary)
}

/// Drops the online data of the repository's project. Registry contents are kept.
pub async fn teardown(config: &RepoConfig, repo_path: impl AsRef<Path>) -> Result<(), FeastError> {
    check_repo(repo_path)?;
    FeatureStore::from_config(config.clone()).await?.teardown().await
}

/// Pretty JSON of the project's entities and feature views.
pub async fn registry_dump(config: &RepoConfig) -> Result<String, FeastError> {
    let store = FeatureStore::from_config(config.clone()).await?;
    let entities = store.list_entities(&BTreeMap::new()).await?;
    let feature_views = store.list_feature_views(&BTreeMap::new()).await?;

    let dump = json!({
        "project": store.project(),
        "entities": entities,
        "feature_views": feature_views,
    });
    serde_json::to_string_pretty(&dump).context("registry dump")
}

fn feature_store_yaml(project: &str) -> String {
    format!(
        "project: {project}\n\
         metadata_store: data/metadata.db\n\
         provider: local\n\
         online_store:\n  local:\n    path: data/online_store\n"
    )
}

/// Creates a repository in `repo_path`. The project is named after the directory.
///
/// Unless `minimal`, also writes [`EXAMPLE_FILE`] and fifteen days of hourly sample data to
/// [`DRIVER_STATS_CSV`]. Returns the files written.
///
/// # Errors
/// [`FeastError::RepoExists`] when `feature_store.yaml` is already there.
pub fn init_repo(repo_path: impl AsRef<Path>, minimal: bool) -> Result<Vec<PathBuf>, FeastError> {
    let repo_path = repo_path.as_ref();
    let config_file = repo_path.join(FEATURE_STORE_YAML);
    if config_file.exists() {
        return Err(FeastError::RepoExists { path: config_file });
    }

    fs::create_dir_all(repo_path).context(format!("Failed to create {}", repo_path.display()))?;
    let dir_name = fs::canonicalize(repo_path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let project = sanitize_name(&dir_name);

    fs::write(&config_file, feature_store_yaml(&project))
        .context(format!("Failed to write {}", config_file.display()))?;
    let mut written = vec![config_file];

    if !minimal {
        let example = repo_path.join(EXAMPLE_FILE);
        fs::write(&example, EXAMPLE_DEFINITIONS).context(format!("Failed to write {}", example.display()))?;
        written.push(example);

        let data = repo_path.join(DRIVER_STATS_CSV);
        if let Some(parent) = data.parent() {
            fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        let end = Utc::now().duration_trunc(Duration::hours(1)).unwrap_or_else(|_| Utc::now());
        let rows = driver_data::create_driver_hourly_stats(&EXAMPLE_DRIVERS, end - Duration::days(15), end);
        let file = fs::File::create(&data).context(format!("Failed to create {}", data.display()))?;
        driver_data::write_csv(&rows, file).context(format!("Failed to write {}", data.display()))?;
        written.push(data);
    }

    info!(project = %project, path = %repo_path.display(), minimal, "Initialized repository");
    Ok(written)
}
