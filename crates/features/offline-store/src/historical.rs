//! Point-in-time joins of entity rows against feature view sources.

use crate::error::{OfflineStoreError, OfflineStoreErrorExt};
use crate::source::{SourceRow, invalid_value, join_keys, read_source};
use chrono::{DateTime, Utc};
use feast_domain::time::parse_timestamp;
use feast_domain::{Entity, EntityKey, FeatureRef, FeatureView, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Column holding the lookup time of each entity row.
pub const EVENT_TIMESTAMP_COLUMN: &str = "event_timestamp";

/// Entity rows to enrich: raw text cells plus the parsed `event_timestamp` of each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFrame {
    label: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    timestamps: Vec<DateTime<Utc>>,
}

impl EntityFrame {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OfflineStoreError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).context(format!("Failed to open {}", path.display()))?;
        Self::from_reader(file, path.display().to_string())
    }

    /// Reads CSV from any reader; `label` names the input in errors.
    pub fn from_reader(reader: impl io::Read, label: impl Into<String>) -> Result<Self, OfflineStoreError> {
        let label = label.into();
        let mut reader = csv::Reader::from_reader(reader);
        let columns: Vec<String> = reader
            .headers()
            .context(format!("Failed to read header of {label}"))?
            .iter()
            .map(str::to_owned)
            .collect();
        let ts_index = columns.iter().position(|c| c == EVENT_TIMESTAMP_COLUMN).ok_or_else(|| {
            OfflineStoreError::MissingColumn { column: EVENT_TIMESTAMP_COLUMN.to_owned(), path: label.clone() }
        })?;

        let mut rows = Vec::new();
        let mut timestamps = Vec::new();
        for (position, record) in reader.records().enumerate() {
            let row = position + 1;
            let record = record.context(format!("Failed to read row {row} of {label}"))?;
            let ts = parse_timestamp(record.get(ts_index).unwrap_or_default())
                .map_err(|e| invalid_value(&label, row, EVENT_TIMESTAMP_COLUMN, e))?;
            timestamps.push(ts);
            rows.push(record.iter().map(str::to_owned).collect());
        }

        Ok(Self { label, columns, rows, timestamps })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The entity key of row `row` for the given join keys.
    fn entity_key(
        &self,
        row: usize,
        keys: &[(String, feast_domain::ValueType)],
    ) -> Result<EntityKey, OfflineStoreError> {
        keys.iter()
            .map(|(join_key, value_type)| {
                let index = self.columns.iter().position(|c| c == join_key).ok_or_else(|| {
                    OfflineStoreError::MissingColumn { column: join_key.clone(), path: self.label.clone() }
                })?;
                let raw = self.rows[row].get(index).map_or("", String::as_str);
                Value::parse(raw, *value_type)
                    .map(|value| (join_key.clone(), value))
                    .map_err(|e| invalid_value(&self.label, row + 1, join_key, e))
            })
            .collect()
    }
}

/// Result of a historical retrieval. Entity row cells are passed through as
/// [`Value::String`]; feature cells are typed and [`Value::Null`] where nothing matched.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl HistoricalFrame {
    /// Values of one column, top to bottom.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index)).collect())
    }

    pub fn write_csv(&self, writer: impl io::Write) -> Result<(), OfflineStoreError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns).context("Failed to write header")?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Value::to_cell)).context("Failed to write row")?;
        }
        writer.flush().context("Failed to flush output")?;
        Ok(())
    }
}

/// Source rows of one view grouped by serialized entity key, each group oldest first.
type Timeline = BTreeMap<Vec<u8>, Vec<SourceRow>>;

fn timeline(rows: Vec<SourceRow>) -> Result<Timeline, OfflineStoreError> {
    let mut grouped = Timeline::new();
    for row in rows {
        let key = row.entity_key.serialize().context("Failed to serialize source key")?;
        grouped.entry(key).or_default().push(row);
    }
    for group in grouped.values_mut() {
        group.sort_by_key(SourceRow::recency);
    }
    Ok(grouped)
}

/// Latest row at or before `ts`, no older than the view's TTL.
fn as_of<'a>(
    group: &'a [SourceRow],
    ts: DateTime<Utc>,
    ttl: Option<chrono::Duration>,
) -> Option<&'a SourceRow> {
    let visible = &group[..group.partition_point(|row| row.event_ts <= ts)];
    // A horizon before the representable range means no lower bound.
    let horizon = ttl.and_then(|ttl| ts.checked_sub_signed(ttl));
    visible.last().filter(|row| horizon.is_none_or(|horizon| row.event_ts >= horizon))
}

pub(crate) fn join(
    repo_path: &Path,
    frame: &EntityFrame,
    views: &[FeatureView],
    entities: &[Entity],
    refs: &[FeatureRef],
) -> Result<HistoricalFrame, OfflineStoreError> {
    let mut columns = frame.columns.clone();
    let mut rows: Vec<Vec<Value>> =
        frame.rows.iter().map(|row| row.iter().cloned().map(Value::String).collect()).collect();

    // Views in order of first reference, each with its referenced features.
    let mut requested: Vec<(&FeatureView, Vec<&FeatureRef>)> = Vec::new();
    for feature_ref in refs {
        let view = views.iter().find(|v| v.name == feature_ref.view).ok_or_else(|| {
            OfflineStoreError::Internal {
                message: format!("feature view '{}' was not provided", feature_ref.view).into(),
                context: None,
            }
        })?;
        if view.feature(&feature_ref.feature).is_none() {
            return Err(OfflineStoreError::UnknownFeature {
                feature: feature_ref.feature.clone(),
                view: view.name.clone(),
            });
        }
        match requested.iter_mut().find(|(v, _)| v.name == view.name) {
            Some((_, features)) => features.push(feature_ref),
            None => requested.push((view, vec![feature_ref])),
        }
    }

    for (view, features) in requested {
        let keys = join_keys(view, entities)?;
        let source = read_source(&repo_path.join(&view.input.path), view, &keys, None)?;
        let timeline = timeline(source)?;
        let ttl = view.ttl();

        columns.extend(features.iter().map(|f| f.column_name()));
        for (index, row) in rows.iter_mut().enumerate() {
            let key = frame.entity_key(index, &keys)?.serialize().context("Failed to serialize entity row key")?;
            let hit = timeline.get(&key).and_then(|group| as_of(group, frame.timestamps[index], ttl));
            row.extend(features.iter().map(|f| {
                hit.and_then(|source_row| source_row.values.get(&f.feature)).cloned().unwrap_or(Value::Null)
            }));
        }
    }

    Ok(HistoricalFrame { columns, rows })
}
