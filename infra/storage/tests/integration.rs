use feast_storage::*;
use tempfile::TempDir;

async fn open(temp: &TempDir) -> Storage {
    Storage::builder().root(temp.path()).connect().await.unwrap()
}

#[tokio::test]
async fn test_path_traversal_blocked() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    assert!(storage.read("../etc/passwd").await.is_err());
    assert!(storage.write("foo/../../bar", b"x").await.is_err());

    let ns = storage.namespace("driver_ranking").unwrap();
    assert!(ns.write("../../escape.bin", b"x").await.is_err());
    assert!(ns.remove_dir("../..").await.is_err());
    assert!(!temp.path().parent().unwrap().join("escape.bin").exists());
}

#[tokio::test]
async fn test_root_files_are_not_sharded() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.write("metadata.db", b"registry").await.unwrap();
    assert_eq!(std::fs::read(temp.path().join("metadata.db")).unwrap(), b"registry");
}

#[tokio::test]
async fn test_write_read_roundtrip_compressed() {
    let temp = TempDir::new().unwrap();
    let storage =
        Storage::builder().root(temp.path()).compression(Compression::Lz4).connect().await.unwrap();

    let payload = vec![1u8; 4096];
    storage.write("metadata.db", &payload).await.unwrap();
    storage.write("metadata.db", &payload[..100]).await.unwrap();

    assert_eq!(storage.read("metadata.db").await.unwrap(), &payload[..100]);
}

#[tokio::test]
async fn test_namespace_isolation_and_sharding() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    let ns_a = storage.namespace("project_a").unwrap();
    let ns_b = storage.namespace("project_b").unwrap();

    ns_a.write("driver_stats/abcd01", b"a").await.unwrap();
    ns_b.write("driver_stats/abcd01", b"b").await.unwrap();

    assert!(temp.path().join("project_a/driver_stats/ab/cd/abcd01").is_file());

    assert_eq!(ns_a.read("driver_stats/abcd01").await.unwrap(), b"a");
    assert_eq!(ns_b.read("driver_stats/abcd01").await.unwrap(), b"b");
}

#[tokio::test]
async fn test_remove_dir_and_namespace() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;
    let ns = storage.namespace("Project_A").unwrap();

    ns.write("driver_stats/abcd1234", b"x").await.unwrap();
    ns.write("customer_stats/abcd1234", b"y").await.unwrap();
    storage.namespace("project_b").unwrap().write("v/k1k2k3", b"z").await.unwrap();
    storage.write("metadata.db", b"registry").await.unwrap();

    assert!(ns.remove_dir("driver_stats").await.unwrap());
    assert!(!ns.remove_dir("driver_stats").await.unwrap());
    assert!(ns.read("driver_stats/abcd1234").await.is_err());
    assert_eq!(ns.read("customer_stats/abcd1234").await.unwrap(), b"y");

    assert!(storage.remove_namespace("project_a").await.unwrap());
    assert!(!storage.remove_namespace("project_a").await.unwrap());
    assert!(!temp.path().join("project_a").exists());
    assert!(temp.path().join("project_b").is_dir());
    assert_eq!(storage.read("metadata.db").await.unwrap(), b"registry");

    assert!(storage.remove_namespace("../outside").await.is_err());
}

#[tokio::test]
async fn test_delete() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.write("metadata.db", b"x").await.unwrap();
    storage.delete("metadata.db").await.unwrap();
    assert!(!temp.path().join("metadata.db").exists());

    let err = storage.delete("metadata.db").await.unwrap_err();
    assert!(matches!(err, StorageError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_read_missing_returns_file_not_found() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    let err = storage.read("missing.bin").await.expect_err("expected error");
    match err {
        StorageError::FileNotFound { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_without_create_requires_root() {
    let temp = TempDir::new().unwrap();
    let err = Storage::builder()
        .root(temp.path().join("absent"))
        .create(false)
        .connect()
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::DirectoryNotFound { .. }));
}
