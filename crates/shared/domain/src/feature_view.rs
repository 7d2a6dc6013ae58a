use crate::error::DomainError;
use crate::names::validate_name;
use crate::value::ValueType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub dtype: ValueType,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Feature {
    #[must_use]
    pub fn new(name: impl Into<String>, dtype: ValueType) -> Self {
        Self { name: name.into(), dtype, labels: BTreeMap::new() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
}

/// A file-backed batch source. `path` is relative to the repository unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSource {
    pub path: String,
    #[serde(default)]
    pub file_format: FileFormat,
    pub event_timestamp_column: String,
    #[serde(default)]
    pub created_timestamp_column: Option<String>,
    #[serde(default)]
    pub date_partition_column: Option<String>,
    /// Source column name to feature or join key name.
    #[serde(default)]
    pub field_mapping: BTreeMap<String, String>,
}

impl FileSource {
    #[must_use]
    pub fn csv(path: impl Into<String>, event_timestamp_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_format: FileFormat::Csv,
            event_timestamp_column: event_timestamp_column.into(),
            created_timestamp_column: None,
            date_partition_column: None,
            field_mapping: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_created_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.created_timestamp_column = Some(column.into());
        self
    }
}

/// A `[start, end)` window already loaded into the online store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

const fn default_online() -> bool {
    true
}

/// A group of features computed from one source and keyed by the same entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureView {
    pub name: String,
    pub entities: Vec<String>,
    pub features: Vec<Feature>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Maximum feature age in seconds for point-in-time joins; 0 disables the bound.
    #[serde(default, alias = "ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_online")]
    pub online: bool,
    pub input: FileSource,
    #[serde(default)]
    pub created_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub materialization_intervals: Vec<MaterializationInterval>,
}

impl FeatureView {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        entities: Vec<String>,
        features: Vec<Feature>,
        input: FileSource,
    ) -> Self {
        Self {
            name: name.into(),
            entities,
            features,
            tags: BTreeMap::new(),
            ttl_seconds: 0,
            online: true,
            input,
            created_timestamp: None,
            last_updated_timestamp: None,
            materialization_intervals: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    /// `None` when the view has no TTL.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0)
            .then(|| Duration::try_seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX)))
            .flatten()
    }

    /// End of the latest materialized window.
    #[must_use]
    pub fn most_recent_end(&self) -> Option<DateTime<Utc>> {
        self.materialization_intervals.iter().map(|i| i.end).max()
    }

    /// Validates names and rejects views without entities or with duplicate features.
    pub fn normalized(self) -> Result<Self, DomainError> {
        validate_name("feature view", &self.name)?;

        if self.entities.is_empty() {
            return Err(self.invalid("entities", "at least one entity is required"));
        }
        for entity in &self.entities {
            validate_name("entity", entity)?;
        }

        if self.features.is_empty() {
            return Err(self.invalid("features", "at least one feature is required"));
        }
        let mut seen = BTreeSet::new();
        for feature in &self.features {
            validate_name("feature", &feature.name)?;
            if !seen.insert(feature.name.as_str()) {
                return Err(
                    self.invalid("features", format!("duplicate feature '{}'", feature.name))
                );
            }
            if feature.dtype == ValueType::Invalid {
                return Err(
                    self.invalid("features", format!("feature '{}' has no dtype", feature.name))
                );
            }
        }

        if self.input.event_timestamp_column.trim().is_empty() {
            return Err(self.invalid("input", "event_timestamp_column is required"));
        }

        Ok(self)
    }

    fn invalid(&self, field: &'static str, message: impl Into<String>) -> DomainError {
        DomainError::InvalidDefinition {
            field,
            message: message.into().into(),
            context: Some(format!("feature view '{}'", self.name).into()),
        }
    }
}
