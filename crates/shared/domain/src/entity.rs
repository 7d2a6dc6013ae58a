use crate::error::DomainError;
use crate::names::validate_name;
use crate::value::ValueType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A domain object that features are keyed on (a driver, a customer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub description: String,
    /// Column carrying the entity value in sources and entity rows. Defaults to `name`.
    #[serde(default)]
    pub join_key: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub created_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated_timestamp: Option<DateTime<Utc>>,
}

impl Entity {
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            join_key: name.clone(),
            name,
            value_type,
            description: String::new(),
            labels: BTreeMap::new(),
            created_timestamp: None,
            last_updated_timestamp: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_join_key(mut self, join_key: impl Into<String>) -> Self {
        self.join_key = join_key.into();
        self
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Validates names and fills the default join key.
    pub fn normalized(mut self) -> Result<Self, DomainError> {
        validate_name("entity", &self.name)?;
        if self.join_key.is_empty() {
            self.join_key.clone_from(&self.name);
        }
        validate_name("join key", &self.join_key)?;
        if self.value_type == ValueType::Invalid || self.value_type.element().is_some() {
            return Err(DomainError::InvalidDefinition {
                field: "value_type",
                message: format!("{} cannot key entity '{}'", self.value_type, self.name).into(),
                context: None,
            });
        }
        Ok(self)
    }
}
