use feast_domain::config::ProviderKind;
use feast_kernel::config::{
    ConfigError, load_cli_properties, load_repo_config, save_cli_properties, set_cli_property,
};
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

fn write_repo(yaml: &str) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("feature_store.yaml"), yaml).unwrap();
    dir
}

#[test]
#[serial]
fn loads_repo_config_with_defaults() {
    let repo = write_repo("project: driver_ranking\n");
    let cfg = load_repo_config(repo.path()).unwrap();

    assert_eq!(cfg.project, "driver_ranking");
    assert_eq!(cfg.provider, ProviderKind::Local);
    assert_eq!(cfg.registry_cache_ttl_seconds, 600);
    let root = repo.path().canonicalize().unwrap();
    assert_eq!(cfg.registry_path(), root.join("data/metadata.db"));
    assert_eq!(cfg.online_store_path(), root.join("data/online_store"));
}

#[test]
#[serial]
fn reads_nested_online_store_section() {
    let repo = write_repo(
        "project: p\nmetadata_store: registry/registry.db\nonline_store:\n  local:\n    path: /tmp/feast_online\nregistry_cache_ttl_seconds: 5\n",
    );
    let cfg = load_repo_config(repo.path()).unwrap();

    assert!(cfg.registry_path().ends_with("registry/registry.db"));
    assert_eq!(cfg.online_store_path(), std::path::PathBuf::from("/tmp/feast_online"));
    assert_eq!(cfg.registry_cache_ttl_seconds, 5);
}

#[test]
#[serial]
fn missing_repo_has_exact_message() {
    let dir = tempdir().unwrap();
    let err = load_repo_config(dir.path()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Can't find feature_store.yaml at {}. Make sure you're running this command in an initialized feast repository.",
            dir.path().display()
        )
    );
}

#[test]
#[serial]
fn invalid_project_name_is_rejected() {
    let repo = write_repo("project: driver-ranking\n");
    let err = load_repo_config(repo.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "{err}");
}

#[test]
fn cli_properties_roundtrip_through_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/config.toml");

    assert_eq!(load_cli_properties(&path).unwrap(), Default::default());

    let props = set_cli_property(&path, "project", "driver_ranking").unwrap();
    assert_eq!(props.project.as_deref(), Some("driver_ranking"));

    let mut reloaded = load_cli_properties(&path).unwrap();
    assert_eq!(reloaded, props);

    reloaded.set("log_format", "json");
    save_cli_properties(&path, &reloaded).unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("log_format = \"json\""));

    let err = set_cli_property(&path, "core_url", "localhost:6565").unwrap_err();
    assert!(err.to_string().starts_with("Unknown property 'core_url'"));
}
