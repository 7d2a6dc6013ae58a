use crate::error::{OnlineStoreError, OnlineStoreErrorExt};
use chrono::{DateTime, Utc};
use feast_domain::{EntityKey, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Feature name to value for one entity of one view.
pub type FeatureValues = BTreeMap<String, Value>;

/// One row handed to [`crate::OnlineStore::online_write_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineRow {
    pub entity_key: EntityKey,
    pub values: FeatureValues,
    pub event_ts: DateTime<Utc>,
    pub created_ts: Option<DateTime<Utc>>,
}

/// What a lookup returns per key: the stored event time and values, or `(None, None)`.
pub type ReadResult = (Option<DateTime<Utc>>, Option<FeatureValues>);

/// Persisted form of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredRow {
    pub(crate) event_ts: DateTime<Utc>,
    pub(crate) created_ts: Option<DateTime<Utc>>,
    pub(crate) values: FeatureValues,
}

impl StoredRow {
    pub(crate) fn encode(&self) -> Result<Vec<u8>, OnlineStoreError> {
        postcard::to_stdvec(self).context("Failed to encode online row")
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, OnlineStoreError> {
        postcard::from_bytes(bytes).context("Failed to decode online row")
    }

    pub(crate) fn into_read_result(self) -> ReadResult {
        (Some(self.event_ts), Some(self.values))
    }
}

impl From<OnlineRow> for StoredRow {
    fn from(row: OnlineRow) -> Self {
        Self { event_ts: row.event_ts, created_ts: row.created_ts, values: row.values }
    }
}

/// A row replaces the stored one only if it is strictly newer: a later `event_ts`, or the same
/// `event_ts` with a later `created_ts`. A missing `created_ts` is older than any present one.
pub(crate) fn should_overwrite(
    existing: Option<&StoredRow>,
    event_ts: DateTime<Utc>,
    created_ts: Option<DateTime<Utc>>,
) -> bool {
    existing.is_none_or(|old| {
        old.event_ts < event_ts || (old.event_ts == event_ts && old.created_ts < created_ts)
    })
}

/// SHA-256 of the serialized key; the digest addresses the row.
pub(crate) fn key_digest(key: &EntityKey) -> Result<[u8; 32], OnlineStoreError> {
    let bytes = key.serialize().context("Failed to serialize entity key")?;
    Ok(Sha256::digest(&bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stored(event_ts: DateTime<Utc>, created_ts: Option<DateTime<Utc>>) -> StoredRow {
        StoredRow { event_ts, created_ts, values: FeatureValues::new() }
    }

    #[test]
    fn overwrite_rule() {
        let t = Utc::now();
        let h = Duration::hours(1);
        let old = stored(t, Some(t));

        assert!(should_overwrite(None, t, None));
        assert!(!should_overwrite(Some(&old), t - h, Some(t + h)), "older event_ts loses");
        assert!(should_overwrite(Some(&old), t + h, Some(t - h)), "newer event_ts wins");
        assert!(!should_overwrite(Some(&old), t, Some(t - h)), "older created_ts loses");
        assert!(should_overwrite(Some(&old), t, Some(t + h)), "newer created_ts wins");
        assert!(!should_overwrite(Some(&old), t, Some(t)), "full tie keeps the stored row");
        assert!(!should_overwrite(Some(&old), t, None));
        assert!(should_overwrite(Some(&stored(t, None)), t, Some(t)));
    }

    #[test]
    fn digest_ignores_pair_order() {
        let a = EntityKey::new(vec![
            ("driver".into(), Value::Int64(1)),
            ("customer".into(), Value::Int64(2)),
        ]);
        let b = EntityKey::new(vec![
            ("customer".into(), Value::Int64(2)),
            ("driver".into(), Value::Int64(1)),
        ]);
        assert_eq!(key_digest(&a).unwrap(), key_digest(&b).unwrap());
    }
}
