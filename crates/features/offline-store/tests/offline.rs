use chrono::{DateTime, Utc};
use feast_domain::time::parse_timestamp;
use feast_domain::{Entity, EntityKey, Feature, FeatureRef, FeatureView, FileSource, Value, ValueType};
use feast_offline_store::{EntityFrame, OfflineStore, OfflineStoreError};
use std::fs;
use tempfile::TempDir;

const DRIVER_STATS: &str = "\
datetime,driver_id,conv_rate,acc_rate,avg_daily_trips,created
2021-04-12 08:00:00,1001,0.1,0.9,10,2021-04-12 09:00:00
2021-04-12 09:00:00,1001,0.2,0.8,20,2021-04-12 09:30:00
2021-04-12 09:00:00,1001,0.25,0.8,25,2021-04-12 10:00:00
2021-04-12 10:00:00,1001,0.3,0.7,30,2021-04-12 10:30:00
2021-04-12 08:00:00,1002,0.5,0.5,50,2021-04-12 09:00:00
";

fn ts(s: &str) -> DateTime<Utc> {
    parse_timestamp(s).unwrap()
}

fn repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("data")).unwrap();
    fs::write(temp.path().join("data/driver_stats.csv"), DRIVER_STATS).unwrap();
    temp
}

fn driver() -> Entity {
    Entity::new("driver_id", ValueType::Int64)
}

fn driver_hourly_stats() -> FeatureView {
    FeatureView::new(
        "driver_hourly_stats",
        vec!["driver_id".into()],
        vec![
            Feature::new("conv_rate", ValueType::Float),
            Feature::new("acc_rate", ValueType::Float),
            Feature::new("avg_daily_trips", ValueType::Int64),
        ],
        FileSource::csv("data/driver_stats.csv", "datetime").with_created_timestamp_column("created"),
    )
}

#[tokio::test]
async fn pull_latest_keeps_newest_row_per_key_in_window() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());

    let rows = store
        .pull_latest(&driver_hourly_stats(), &[driver()], ts("2021-04-12 00:00:00"), ts("2021-04-12 10:00:00"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    let d1001 = rows.iter().find(|r| r.entity_key == EntityKey::single("driver_id", Value::Int64(1001))).unwrap();
    // 10:00 is outside [start, end); of the two 09:00 rows the later-created one wins.
    assert_eq!(d1001.event_ts, ts("2021-04-12 09:00:00"));
    assert_eq!(d1001.created_ts, Some(ts("2021-04-12 10:00:00")));
    assert_eq!(d1001.values["avg_daily_trips"], Value::Int64(25));
    assert_eq!(d1001.values["conv_rate"], Value::Float(0.25));
}

#[tokio::test]
async fn pull_latest_of_empty_window_is_empty() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let rows = store
        .pull_latest(&driver_hourly_stats(), &[driver()], ts("2020-01-01"), ts("2020-01-02"))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn field_mapping_renames_source_columns() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let mut view = driver_hourly_stats();
    view.features = vec![Feature::new("trips", ValueType::Int64)];
    view.input.field_mapping.insert("avg_daily_trips".into(), "trips".into());

    let rows = store.pull_latest(&view, &[driver()], ts("2021-04-12"), ts("2021-04-13")).await.unwrap();
    let d1001 = rows.iter().find(|r| r.entity_key.get("driver_id") == Some(&Value::Int64(1001))).unwrap();
    assert_eq!(d1001.values["trips"], Value::Int64(30));
}

#[tokio::test]
async fn entity_join_key_selects_the_source_column() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let mut view = driver_hourly_stats();
    view.entities = vec!["driver".into()];
    let entity = Entity::new("driver", ValueType::Int64).with_join_key("driver_id");

    let rows = store.pull_latest(&view, &[entity], ts("2021-04-12"), ts("2021-04-13")).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.entity_key.get("driver_id").is_some()));
}

#[tokio::test]
async fn missing_column_is_reported() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let mut view = driver_hourly_stats();
    view.features.push(Feature::new("rating", ValueType::Double));

    let err = store.pull_latest(&view, &[driver()], ts("2021-04-12"), ts("2021-04-13")).await.unwrap_err();
    assert!(matches!(err, OfflineStoreError::MissingColumn { ref column, .. } if column == "rating"), "{err}");
}

#[tokio::test]
async fn unparsable_cell_reports_row_and_column() {
    let temp = repo();
    fs::write(
        temp.path().join("data/driver_stats.csv"),
        "datetime,driver_id,conv_rate,acc_rate,avg_daily_trips,created\n\
         2021-04-12 08:00:00,1001,0.1,0.9,10,\n\
         2021-04-12 09:00:00,1001,0.2,0.8,many,\n",
    )
    .unwrap();
    let store = OfflineStore::new(temp.path());

    let err = store
        .pull_latest(&driver_hourly_stats(), &[driver()], ts("2021-04-12"), ts("2021-04-13"))
        .await
        .unwrap_err();
    match err {
        OfflineStoreError::InvalidValue { row, column, .. } => {
            assert_eq!(row, 2);
            assert_eq!(column, "avg_daily_trips");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unknown_entity_fails() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let err = store
        .pull_latest(&driver_hourly_stats(), &[], ts("2021-04-12"), ts("2021-04-13"))
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineStoreError::UnknownEntity { .. }));
}

#[tokio::test]
async fn historical_features_join_point_in_time() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let view = driver_hourly_stats().with_ttl_seconds(3600);

    let entity_rows = EntityFrame::from_reader(
        "driver_id,event_timestamp\n\
         1001,2021-04-12 09:30:00\n\
         1001,2021-04-12 07:00:00\n\
         1002,2021-04-12 12:00:00\n\
         1003,2021-04-12 09:00:00\n"
            .as_bytes(),
        "entities.csv",
    )
    .unwrap();
    let refs = [
        FeatureRef::new("driver_hourly_stats", "conv_rate"),
        FeatureRef::new("driver_hourly_stats", "avg_daily_trips"),
    ];

    let frame = store.historical_features(entity_rows, &[view], &[driver()], &refs).await.unwrap();

    assert_eq!(
        frame.columns,
        ["driver_id", "event_timestamp", "driver_hourly_stats__conv_rate", "driver_hourly_stats__avg_daily_trips"]
    );
    let trips: Vec<&Value> = frame.column("driver_hourly_stats__avg_daily_trips").unwrap();
    // 09:30 sees the later-created 09:00 row; 07:00 is before any row; 1002 is beyond the TTL;
    // 1003 has no rows.
    assert_eq!(trips, [&Value::Int64(25), &Value::Null, &Value::Null, &Value::Null]);

    let mut out = Vec::new();
    frame.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("driver_id,event_timestamp,driver_hourly_stats__conv_rate,"));
    assert!(text.contains("1001,2021-04-12 09:30:00,0.25,25"));
    assert!(text.contains("1003,2021-04-12 09:00:00,,"));
}

#[tokio::test]
async fn historical_features_require_join_key_column() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let entity_rows =
        EntityFrame::from_reader("customer_id,event_timestamp\n1,2021-04-12\n".as_bytes(), "entities.csv").unwrap();

    let err = store
        .historical_features(
            entity_rows,
            &[driver_hourly_stats()],
            &[driver()],
            &[FeatureRef::new("driver_hourly_stats", "conv_rate")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineStoreError::MissingColumn { ref column, .. } if column == "driver_id"));
}

#[tokio::test]
async fn historical_features_with_ttl_beyond_time_range_have_no_lower_bound() {
    let temp = repo();
    let store = OfflineStore::new(temp.path());
    let view = driver_hourly_stats().with_ttl_seconds(10_000_000_000_000);
    assert!(view.ttl().is_some());

    let entity_rows =
        EntityFrame::from_reader("driver_id,event_timestamp\n1002,2021-04-12 12:00:00\n".as_bytes(), "entities.csv")
            .unwrap();
    let frame = store
        .historical_features(entity_rows, &[view], &[driver()], &[FeatureRef::new("driver_hourly_stats", "avg_daily_trips")])
        .await
        .unwrap();

    assert_eq!(frame.column("driver_hourly_stats__avg_daily_trips").unwrap(), [&Value::Int64(50)]);
}
