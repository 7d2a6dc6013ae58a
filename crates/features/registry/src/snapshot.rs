use crate::error::{RegistryError, RegistryErrorExt};
use chrono::{DateTime, Utc};
use feast_domain::{Entity, FeatureView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bumped whenever the on-disk layout of [`RegistrySnapshot`] changes.
const FORMAT_VERSION: u16 = 1;

/// Objects registered under one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub archived: bool,
    pub created_timestamp: Option<DateTime<Utc>>,
    pub entities: BTreeMap<String, Entity>,
    pub feature_views: BTreeMap<String, FeatureView>,
}

impl ProjectRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { name: name.into(), created_timestamp: Some(now), ..Self::default() }
    }
}

/// Full registry contents. `version` increases by one with every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub projects: BTreeMap<String, ProjectRecord>,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    format: u16,
    snapshot: T,
}

impl RegistrySnapshot {
    #[must_use]
    pub fn project(&self, name: &str) -> Option<&ProjectRecord> {
        self.projects.get(name)
    }

    pub fn encode_bin(&self) -> Result<Vec<u8>, RegistryError> {
        postcard::to_stdvec(&Envelope { format: FORMAT_VERSION, snapshot: self })
            .context("Failed to encode registry")
    }

    pub fn decode_bin(bytes: &[u8]) -> Result<Self, RegistryError> {
        let envelope: Envelope<Self> =
            postcard::from_bytes(bytes).context("Failed to decode registry")?;
        if envelope.format != FORMAT_VERSION {
            return Err(RegistryError::Internal {
                message: format!("unsupported registry format {}", envelope.format).into(),
                context: Some(format!("expected format {FORMAT_VERSION}").into()),
            });
        }
        Ok(envelope.snapshot)
    }

    /// Marks a completed mutation.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.last_updated = Some(now);
    }
}
