use feast::kernel::config::load_repo_config;
use feast::repo::{self, DRIVER_STATS_CSV, EXAMPLE_FILE};
use feast::{FeastError, FeatureStore};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

const ENTITY_YAML: &str = "\
kind: Entity
name: driver_id
value_type: INT64
";

fn view_yaml(name: &str) -> String {
    format!(
        "kind: FeatureView
name: {name}
entities: [driver_id]
features:
  - name: conv_rate
    dtype: FLOAT
input:
  path: data/driver_stats.csv
  event_timestamp_column: datetime
"
    )
}

#[test]
fn check_repo_explains_missing_config() {
    let temp = TempDir::new().unwrap();
    let err = repo::check_repo(temp.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Can't find feature_store.yaml at "), "{message}");
    assert!(message.ends_with("Make sure you're running this command in an initialized feast repository."));
}

#[test]
fn init_writes_a_complete_repo_once() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("driver-ranking");

    let written = repo::init_repo(&root, false).unwrap();
    assert_eq!(written.len(), 3);
    assert!(root.join(EXAMPLE_FILE).is_file());

    let config = load_repo_config(&root).unwrap();
    assert_eq!(config.project, "driver_ranking");

    let csv = fs::read_to_string(root.join(DRIVER_STATS_CSV)).unwrap();
    // 15 days of hourly rows for 5 drivers plus the header.
    assert_eq!(csv.lines().count(), 15 * 24 * 5 + 1);

    let err = repo::init_repo(&root, true).unwrap_err();
    assert!(matches!(err, FeastError::RepoExists { .. }));
}

#[test]
fn minimal_init_writes_only_the_config() {
    let temp = TempDir::new().unwrap();
    let written = repo::init_repo(temp.path(), true).unwrap();
    assert_eq!(written, [temp.path().join("feature_store.yaml")]);
    assert!(!temp.path().join(EXAMPLE_FILE).exists());
}

#[test]
fn parse_repo_walks_definitions() {
    let temp = TempDir::new().unwrap();
    repo::init_repo(temp.path(), false).unwrap();
    fs::create_dir_all(temp.path().join("features/extra")).unwrap();
    fs::write(temp.path().join("features/extra/daily.yml"), view_yaml("driver_daily_stats")).unwrap();
    // Ignored: hidden directories, the data directory and non-YAML files.
    fs::create_dir_all(temp.path().join(".git")).unwrap();
    fs::write(temp.path().join(".git/view.yaml"), view_yaml("hidden")).unwrap();
    fs::write(temp.path().join("data/view.yaml"), view_yaml("data_view")).unwrap();
    fs::write(temp.path().join("notes.txt"), "kind: nothing").unwrap();

    let contents = repo::parse_repo(temp.path()).unwrap();
    assert_eq!(contents.entities.len(), 1);
    let mut names: Vec<_> = contents.feature_views.iter().map(|v| v.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["driver_daily_stats", "driver_hourly_stats"]);
}

#[test]
fn parse_repo_rejects_duplicates() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.yaml"), format!("{ENTITY_YAML}---\n{}", view_yaml("stats"))).unwrap();
    fs::write(temp.path().join("b.yaml"), view_yaml("stats")).unwrap();

    let err = repo::parse_repo(temp.path()).unwrap_err();
    assert!(matches!(err, FeastError::DuplicateObject { kind: "feature view", ref name, .. } if name == "stats"));
}

#[test]
fn parse_repo_reports_malformed_yaml() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("bad.yaml"), "kind: Entity\nname: [unclosed\n").unwrap();
    assert!(matches!(repo::parse_repo(temp.path()).unwrap_err(), FeastError::Yaml { .. }));
}

#[tokio::test]
async fn apply_total_syncs_registry_with_repo() {
    let temp = TempDir::new().unwrap();
    repo::init_repo(temp.path(), false).unwrap();
    fs::write(temp.path().join("daily.yaml"), view_yaml("driver_daily_stats")).unwrap();
    let config = load_repo_config(temp.path()).unwrap();

    let summary = repo::apply_total(&config, temp.path()).await.unwrap();
    assert_eq!(summary.entities, ["driver_id"]);
    assert_eq!(summary.feature_views.len(), 2);
    assert!(summary.deleted_feature_views.is_empty());

    fs::remove_file(temp.path().join("daily.yaml")).unwrap();
    let summary = repo::apply_total(&config, temp.path()).await.unwrap();
    assert_eq!(summary.deleted_feature_views, ["driver_daily_stats"]);

    let store = FeatureStore::from_config(config.clone()).await.unwrap();
    let names: Vec<_> =
        store.list_feature_views(&BTreeMap::new()).await.unwrap().into_iter().map(|v| v.name).collect();
    assert_eq!(names, ["driver_hourly_stats"]);

    let dump = repo::registry_dump(&config).await.unwrap();
    let dump: serde_json::Value = serde_json::from_str(&dump).unwrap();
    assert_eq!(dump["entities"][0]["name"], "driver_id");
    assert_eq!(dump["feature_views"][0]["name"], "driver_hourly_stats");

    repo::teardown(&config, temp.path()).await.unwrap();
}
