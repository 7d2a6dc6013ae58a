use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `"<view>:<feature>"` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureRef {
    pub view: String,
    pub feature: String,
}

impl FeatureRef {
    #[must_use]
    pub fn new(view: impl Into<String>, feature: impl Into<String>) -> Self {
        Self { view: view.into(), feature: feature.into() }
    }

    /// Column name in historical retrieval output: `<view>__<feature>`.
    #[must_use]
    pub fn column_name(&self) -> String {
        format!("{}__{}", self.view, self.feature)
    }
}

impl FromStr for FeatureRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |context: &'static str| DomainError::InvalidFeatureRef {
            reference: s.to_owned(),
            context: Some(context.into()),
        };

        let (view, feature) = s.trim().split_once(':').ok_or_else(|| invalid("expected view:feature"))?;
        if view.is_empty() || feature.is_empty() {
            return Err(invalid("view and feature must both be set"));
        }
        if feature.contains(':') {
            return Err(invalid("too many ':' separators"));
        }
        Ok(Self::new(view, feature))
    }
}

impl TryFrom<String> for FeatureRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FeatureRef> for String {
    fn from(value: FeatureRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.view, self.feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let r: FeatureRef = "driver_hourly_stats:conv_rate".parse().unwrap();
        assert_eq!(r.view, "driver_hourly_stats");
        assert_eq!(r.feature, "conv_rate");
        assert_eq!(r.to_string(), "driver_hourly_stats:conv_rate");
        assert_eq!(r.column_name(), "driver_hourly_stats__conv_rate");
    }

    #[test]
    fn rejects_malformed_refs() {
        for bad in ["conv_rate", ":conv_rate", "driver_hourly_stats:", "a:b:c"] {
            assert!(matches!(
                bad.parse::<FeatureRef>(),
                Err(DomainError::InvalidFeatureRef { .. })
            ), "{bad}");
        }
    }
}
