//! Typed reading of a feature view's CSV source.

use crate::error::{OfflineStoreError, OfflineStoreErrorExt};
use chrono::{DateTime, Utc};
use feast_domain::time::parse_timestamp;
use feast_domain::{Entity, EntityKey, FeatureView, Value, ValueType};
use std::collections::BTreeMap;
use std::path::Path;

/// One typed source row: the entity key, the view's feature values and both timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub entity_key: EntityKey,
    pub values: BTreeMap<String, Value>,
    pub event_ts: DateTime<Utc>,
    pub created_ts: Option<DateTime<Utc>>,
}

impl SourceRow {
    /// Ordering used to pick the newest of several rows: event time, then creation time.
    pub(crate) const fn recency(&self) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        (self.event_ts, self.created_ts)
    }
}

/// Join key and type of every entity of `view`, in the view's order.
pub(crate) fn join_keys(
    view: &FeatureView,
    entities: &[Entity],
) -> Result<Vec<(String, ValueType)>, OfflineStoreError> {
    view.entities
        .iter()
        .map(|name| {
            entities
                .iter()
                .find(|entity| &entity.name == name)
                .map(|entity| (entity.join_key.clone(), entity.value_type))
                .ok_or_else(|| OfflineStoreError::UnknownEntity {
                    entity: name.clone(),
                    view: view.name.clone(),
                })
        })
        .collect()
}

pub(crate) fn invalid_value(
    path: &str,
    row: usize,
    column: &str,
    err: impl std::fmt::Display,
) -> OfflineStoreError {
    OfflineStoreError::InvalidValue {
        path: path.to_owned(),
        row,
        column: column.to_owned(),
        message: err.to_string(),
    }
}

/// Reads the rows of `view`'s source whose event time is in `[start, end)` (every row when
/// `window` is `None`).
///
/// Entity and feature columns are looked up after applying the source's `field_mapping`;
/// timestamp columns by their source name. Row numbers in errors count data rows from 1.
pub(crate) fn read_source(
    path: &Path,
    view: &FeatureView,
    keys: &[(String, ValueType)],
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<Vec<SourceRow>, OfflineStoreError> {
    let display = path.display().to_string();
    let source = &view.input;

    let mut reader =
        csv::Reader::from_path(path).context(format!("Failed to open source {display}"))?;
    let headers = reader.headers().context(format!("Failed to read header of {display}"))?.clone();

    let mapped = |header: &str| -> String {
        source.field_mapping.get(header).cloned().unwrap_or_else(|| header.to_owned())
    };
    let raw_index = |column: &str| headers.iter().position(|h| h == column);
    let mapped_index = |column: &str| headers.iter().position(|h| mapped(h) == column);
    let missing =
        |column: &str| OfflineStoreError::MissingColumn { column: column.to_owned(), path: display.clone() };

    let ts_column = source.event_timestamp_column.as_str();
    let ts_index = raw_index(ts_column).ok_or_else(|| missing(ts_column))?;
    let created_index = source
        .created_timestamp_column
        .as_deref()
        .map(|column| raw_index(column).map(|index| (column, index)).ok_or_else(|| missing(column)))
        .transpose()?;
    let key_columns = keys
        .iter()
        .map(|(join_key, value_type)| {
            mapped_index(join_key).map(|index| (join_key, index, *value_type)).ok_or_else(|| missing(join_key))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let feature_columns = view
        .features
        .iter()
        .map(|feature| {
            mapped_index(&feature.name)
                .map(|index| (&feature.name, index, feature.dtype))
                .ok_or_else(|| missing(&feature.name))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for (position, record) in reader.records().enumerate() {
        let row = position + 1;
        let record = record.context(format!("Failed to read row {row} of {display}"))?;
        let cell = |index: usize| record.get(index).unwrap_or_default();

        let event_ts =
            parse_timestamp(cell(ts_index)).map_err(|e| invalid_value(&display, row, ts_column, e))?;
        if window.is_some_and(|(start, end)| event_ts < start || event_ts >= end) {
            continue;
        }

        let created_ts = match created_index {
            Some((column, index)) if !cell(index).trim().is_empty() => Some(
                parse_timestamp(cell(index)).map_err(|e| invalid_value(&display, row, column, e))?,
            ),
            _ => None,
        };

        let pairs = key_columns
            .iter()
            .map(|(join_key, index, value_type)| {
                Value::parse(cell(*index), *value_type)
                    .map(|value| ((*join_key).clone(), value))
                    .map_err(|e| invalid_value(&display, row, join_key, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let values = feature_columns
            .iter()
            .map(|(name, index, dtype)| {
                Value::parse(cell(*index), *dtype)
                    .map(|value| ((*name).clone(), value))
                    .map_err(|e| invalid_value(&display, row, name, e))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        rows.push(SourceRow { entity_key: EntityKey::new(pairs), values, event_ts, created_ts });
    }

    Ok(rows)
}
