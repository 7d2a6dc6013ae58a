use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::path::PathBuf;

#[feast_derive::feast_error]
pub enum FeastError {
    #[error("{source}{}", format_context(.context))]
    Config { source: feast_kernel::config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Registry { source: feast_registry::RegistryError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    OnlineStore { source: feast_online_store::OnlineStoreError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    OfflineStore { source: feast_offline_store::OfflineStoreError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Domain { source: feast_domain::DomainError, context: Option<Cow<'static, str>> },

    #[error("Malformed definition{}: {source}", format_context(.context))]
    Yaml { source: serde_yaml::Error, context: Option<Cow<'static, str>> },

    #[error("JSON failure{}: {source}", format_context(.context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("CSV failure{}: {source}", format_context(.context))]
    Csv { source: csv::Error, context: Option<Cow<'static, str>> },

    #[error("I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid interval: start {start} must be before end {end}")]
    InvalidInterval { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("Entity row {row} is missing join key '{join_key}'")]
    MissingEntity { join_key: String, row: usize },

    #[error("Feature '{reference}' is not defined")]
    FeatureNotFound { reference: String },

    #[error("Duplicate {kind} '{name}' in {}", .path.display())]
    DuplicateObject { kind: &'static str, name: String, path: PathBuf },

    #[error("{} already exists, refusing to overwrite", .path.display())]
    RepoExists { path: PathBuf },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl FeastError {
    /// True when a registry lookup found no such entity, feature view or project.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::Registry { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
