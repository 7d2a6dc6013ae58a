use chrono::{DateTime, Utc};
use feast_domain::{Entity, Feature, FeatureView, FileSource, ValueType};
use feast_registry::{Registry, RegistryError};
use std::collections::BTreeMap;
use std::time::Duration;
use tempfile::TempDir;

const PROJECT: &str = "default";

async fn open(temp: &TempDir) -> Registry {
    Registry::builder().path(temp.path().join("data/metadata.db")).open().await.unwrap()
}

fn my_feature_view() -> FeatureView {
    let source = FileSource {
        date_partition_column: Some("date_partition_col".into()),
        ..FileSource::csv("feast/data.csv", "ts_col").with_created_timestamp_column("timestamp")
    };
    FeatureView::new(
        "my_feature_view_1",
        vec!["fs1_my_entity_1".into()],
        vec![
            Feature::new("fs1_my_feature_1", ValueType::Int64),
            Feature::new("fs1_my_feature_2", ValueType::String),
            Feature::new("fs1_my_feature_3", ValueType::StringList),
            Feature::new("fs1_my_feature_4", ValueType::BytesList),
        ],
        source,
    )
    .with_tag("team", "matchmaking")
    .with_ttl_seconds(300)
}

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

#[tokio::test]
async fn apply_entity_success() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;

    let entity = Entity::new("driver_car_id", ValueType::String)
        .with_description("Car driver id")
        .with_label("team", "matchmaking");
    registry.apply_entity(entity, PROJECT).await.unwrap();

    let entities = registry.list_entities(PROJECT, &BTreeMap::new()).await.unwrap();
    assert_eq!(entities.len(), 1);
    let entity = &entities[0];
    assert_eq!(entity.name, "driver_car_id");
    assert_eq!(entity.value_type, ValueType::String);
    assert_eq!(entity.description, "Car driver id");
    assert_eq!(entity.labels.get("team").map(String::as_str), Some("matchmaking"));
    assert!(entity.created_timestamp.is_some());

    let fetched = registry.get_entity("driver_car_id", PROJECT).await.unwrap();
    assert_eq!(&fetched, entity);
}

#[tokio::test]
async fn apply_feature_view_success() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;

    registry.apply_feature_view(my_feature_view(), PROJECT).await.unwrap();

    let views = registry.list_feature_views(PROJECT, &BTreeMap::new()).await.unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.name, "my_feature_view_1");
    let features: Vec<(&str, ValueType)> =
        view.features.iter().map(|f| (f.name.as_str(), f.dtype)).collect();
    assert_eq!(
        features,
        vec![
            ("fs1_my_feature_1", ValueType::Int64),
            ("fs1_my_feature_2", ValueType::String),
            ("fs1_my_feature_3", ValueType::StringList),
            ("fs1_my_feature_4", ValueType::BytesList),
        ]
    );
    assert_eq!(view.entities, vec!["fs1_my_entity_1"]);

    let fetched = registry.get_feature_view("my_feature_view_1", PROJECT).await.unwrap();
    assert_eq!(fetched.ttl_seconds, 300);
    assert_eq!(fetched.input.date_partition_column.as_deref(), Some("date_partition_col"));

    registry.delete_feature_view("my_feature_view_1", PROJECT).await.unwrap();
    assert!(registry.list_feature_views(PROJECT, &BTreeMap::new()).await.unwrap().is_empty());

    let err = registry.delete_feature_view("my_feature_view_1", PROJECT).await.unwrap_err();
    assert!(matches!(err, RegistryError::FeatureViewNotFound { .. }));
}

#[tokio::test]
async fn reapply_keeps_intervals_and_creation_time() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;

    let first = registry.apply_feature_view(my_feature_view(), PROJECT).await.unwrap();
    registry.record_materialization("my_feature_view_1", PROJECT, ts(0), ts(3600)).await.unwrap();

    let updated = my_feature_view().with_ttl_seconds(600);
    let second = registry.apply_feature_view(updated, PROJECT).await.unwrap();

    assert_eq!(second.ttl_seconds, 600);
    assert_eq!(second.created_timestamp, first.created_timestamp);
    assert_eq!(second.materialization_intervals.len(), 1);
    assert_eq!(second.most_recent_end(), Some(ts(3600)));
}

#[tokio::test]
async fn filters_by_labels_and_tags() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;

    registry
        .apply_entity(Entity::new("driver_id", ValueType::Int64).with_label("team", "ranking"), PROJECT)
        .await
        .unwrap();
    registry.apply_entity(Entity::new("customer_id", ValueType::String), PROJECT).await.unwrap();
    registry.apply_feature_view(my_feature_view(), PROJECT).await.unwrap();

    let team: BTreeMap<String, String> = [("team".to_owned(), "ranking".to_owned())].into();
    let entities = registry.list_entities(PROJECT, &team).await.unwrap();
    assert_eq!(entities.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["driver_id"]);

    assert!(registry.list_feature_views(PROJECT, &team).await.unwrap().is_empty());
}

#[tokio::test]
async fn every_mutation_bumps_version() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;
    assert_eq!(registry.snapshot().await.unwrap().version, 0);

    registry.apply_entity(Entity::new("driver_id", ValueType::Int64), PROJECT).await.unwrap();
    registry.apply_feature_view(my_feature_view(), PROJECT).await.unwrap();
    registry.delete_entity("driver_id", PROJECT).await.unwrap();

    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(snapshot.version, 3);
    assert!(snapshot.last_updated.is_some());
    assert!(registry.path().is_file());
}

#[tokio::test]
async fn failed_mutation_leaves_registry_untouched() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;

    let err = registry.delete_entity("missing", PROJECT).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(registry.snapshot().await.unwrap().version, 0);
    assert!(!registry.path().exists());
}

#[tokio::test]
async fn projects_lifecycle() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;

    registry.create_project("driver_ranking").await.unwrap();
    registry.apply_entity(Entity::new("driver_id", ValueType::Int64), "fraud").await.unwrap();
    assert_eq!(registry.list_projects().await.unwrap(), vec!["driver_ranking", "fraud"]);

    let err = registry.create_project("driver_ranking").await.unwrap_err();
    assert!(matches!(err, RegistryError::ProjectExists { .. }));

    registry.archive_project("fraud").await.unwrap();
    assert_eq!(registry.list_projects().await.unwrap(), vec!["driver_ranking"]);

    let err = registry.apply_entity(Entity::new("card", ValueType::String), "fraud").await.unwrap_err();
    assert!(matches!(err, RegistryError::ProjectArchived { .. }));

    let err = registry.archive_project("fraud").await.unwrap_err();
    assert!(matches!(err, RegistryError::ProjectNotFound { .. }));

    let err = registry.create_project("bad-name").await.unwrap_err();
    assert_eq!(err.kind(), "Domain");
}

#[tokio::test]
async fn cache_serves_stale_reads_until_refresh() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("metadata.db");
    let writer = Registry::builder().path(&path).cache_ttl(Duration::ZERO).open().await.unwrap();
    let cached = Registry::builder().path(&path).cache_ttl(Duration::from_secs(600)).open().await.unwrap();
    let uncached = Registry::builder().path(&path).cache_ttl(Duration::ZERO).open().await.unwrap();

    assert!(cached.list_projects().await.unwrap().is_empty());
    writer.create_project("driver_ranking").await.unwrap();

    assert!(cached.list_projects().await.unwrap().is_empty());
    assert_eq!(uncached.list_projects().await.unwrap(), vec!["driver_ranking"]);

    cached.refresh();
    assert_eq!(cached.list_projects().await.unwrap(), vec!["driver_ranking"]);
}

#[tokio::test]
async fn teardown_removes_registry_file() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;
    registry.create_project("driver_ranking").await.unwrap();

    registry.teardown().await.unwrap();
    assert!(!registry.path().exists());
    assert!(registry.list_projects().await.unwrap().is_empty());
    registry.teardown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_applies_are_serialized() {
    let temp = TempDir::new().unwrap();
    let registry = open(&temp).await;

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .apply_entity(Entity::new(format!("entity_{i}"), ValueType::Int64), PROJECT)
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let snapshot = registry.snapshot().await.unwrap();
    assert_eq!(snapshot.version, 16);
    assert_eq!(snapshot.project(PROJECT).unwrap().entities.len(), 16);
}
