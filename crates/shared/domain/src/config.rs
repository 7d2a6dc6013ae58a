use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_METADATA_STORE: &str = "data/metadata.db";
pub const DEFAULT_ONLINE_STORE_PATH: &str = "data/online_store";
pub const DEFAULT_REGISTRY_CACHE_TTL_SECONDS: u64 = 600;

/// Where online rows live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Files under `online_store.local.path`.
    #[default]
    Local,
    /// Process memory; lost on exit.
    Memory,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOnlineStoreConfig {
    /// Directory holding online rows.
    pub path: PathBuf,
}

impl Default for LocalOnlineStoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from(DEFAULT_ONLINE_STORE_PATH) }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineStoreConfig {
    pub local: LocalOnlineStoreConfig,
}

const fn default_cache_ttl() -> u64 {
    DEFAULT_REGISTRY_CACHE_TTL_SECONDS
}

fn default_metadata_store() -> PathBuf {
    PathBuf::from(DEFAULT_METADATA_STORE)
}

/// Contents of `feature_store.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub project: String,
    /// Registry file.
    #[serde(default = "default_metadata_store")]
    pub metadata_store: PathBuf,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub online_store: OnlineStoreConfig,
    #[serde(default = "default_cache_ttl")]
    pub registry_cache_ttl_seconds: u64,
    /// Directory the file was loaded from; relative paths resolve against it.
    #[serde(skip)]
    pub repo_path: PathBuf,
}

impl RepoConfig {
    #[must_use]
    pub fn new(project: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            metadata_store: default_metadata_store(),
            provider: ProviderKind::Local,
            online_store: OnlineStoreConfig::default(),
            registry_cache_ttl_seconds: DEFAULT_REGISTRY_CACHE_TTL_SECONDS,
            repo_path: repo_path.into(),
        }
    }

    #[must_use]
    pub const fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.resolve(&self.metadata_store)
    }

    #[must_use]
    pub fn online_store_path(&self) -> PathBuf {
        self.resolve(&self.online_store.local.path)
    }

    /// Resolves a repo-relative path; absolute paths are returned unchanged.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.repo_path.join(path)
    }
}

/// Keys accepted by `feast config set`.
pub const CLI_PROPERTIES: [&str; 4] = ["project", "repo_path", "log_level", "log_format"];

/// User-level CLI defaults kept in `~/.feast/config.toml`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliProperties {
    pub project: Option<String>,
    pub repo_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl CliProperties {
    /// Effective value of a property, or `None` when unset or unknown.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<String> {
        match property {
            "project" => self.project.clone(),
            "repo_path" => self.repo_path.as_ref().map(|p| p.display().to_string()),
            "log_level" => self.log_level.clone(),
            "log_format" => self.log_format.clone(),
            _ => None,
        }
    }

    /// Sets a known property. Returns `false` for unknown names.
    pub fn set(&mut self, property: &str, value: &str) -> bool {
        let value = value.to_owned();
        match property {
            "project" => self.project = Some(value),
            "repo_path" => self.repo_path = Some(PathBuf::from(value)),
            "log_level" => self.log_level = Some(value),
            "log_format" => self.log_format = Some(value),
            _ => return false,
        }
        true
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown provider '{other}', expected 'local' or 'memory'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_against_repo() {
        let cfg = RepoConfig::new("driver_ranking", "/repo");
        assert_eq!(cfg.registry_path(), PathBuf::from("/repo/data/metadata.db"));
        assert_eq!(cfg.online_store_path(), PathBuf::from("/repo/data/online_store"));

        let mut cfg = cfg;
        cfg.metadata_store = PathBuf::from("/var/feast/registry.db");
        assert_eq!(cfg.registry_path(), PathBuf::from("/var/feast/registry.db"));
    }

    #[test]
    fn cli_properties_get_and_set() {
        let mut props = CliProperties::default();
        assert!(props.set("project", "driver_ranking"));
        assert!(props.set("repo_path", "/repo"));
        assert!(!props.set("core_url", "localhost:6565"));
        assert_eq!(props.get("project").as_deref(), Some("driver_ranking"));
        assert_eq!(props.get("repo_path").as_deref(), Some("/repo"));
        assert_eq!(props.get("log_level"), None);
    }
}
