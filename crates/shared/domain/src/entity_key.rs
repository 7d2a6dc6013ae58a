use crate::error::{DomainError, DomainErrorExt};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Identifies one row of a feature view: `(join key, value)` pairs.
///
/// Pair order is irrelevant to identity; [`EntityKey::serialize`] sorts by join key first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityKey {
    pairs: Vec<(String, Value)>,
}

impl EntityKey {
    #[must_use]
    pub fn new(pairs: Vec<(String, Value)>) -> Self {
        Self { pairs }
    }

    #[must_use]
    pub fn single(join_key: impl Into<String>, value: Value) -> Self {
        Self { pairs: vec![(join_key.into(), value)] }
    }

    #[must_use]
    pub fn pairs(&self) -> &[(String, Value)] {
        &self.pairs
    }

    #[must_use]
    pub fn get(&self, join_key: &str) -> Option<&Value> {
        self.pairs.iter().find(|(k, _)| k == join_key).map(|(_, v)| v)
    }

    /// Stable byte form used to address stored rows.
    pub fn serialize(&self) -> Result<Vec<u8>, DomainError> {
        let mut sorted: Vec<&(String, Value)> = self.pairs.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        postcard::to_stdvec(&sorted).context("Failed to serialize entity key")
    }
}

impl FromIterator<(String, Value)> for EntityKey {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
