use config::{Config, Environment, File};
use feast_domain::config::{CLI_PROPERTIES, CliProperties, RepoConfig};
use feast_domain::names::validate_name;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the repository configuration.
pub const FEATURE_STORE_YAML: &str = "feature_store.yaml";
/// Overrides the location of the CLI properties file.
pub const CONFIG_PATH_ENV: &str = "FEAST_CONFIG_PATH";
/// Environment override prefix: `FEAST__PROJECT`, `FEAST__ONLINE_STORE__LOCAL__PATH`.
pub const ENV_PREFIX: &str = "FEAST";

#[feast_derive::feast_error]
pub enum ConfigError {
    #[error(
        "Can't find feature_store.yaml at {}. Make sure you're running this command in an initialized feast repository.",
        .path.display()
    )]
    RepoNotFound { path: PathBuf },

    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Invalid repository configuration{}: {source}", format_context(.context))]
    Invalid { source: feast_domain::DomainError, context: Option<Cow<'static, str>> },

    #[error("Unknown property '{property}', expected one of: {}", CLI_PROPERTIES.join(", "))]
    UnknownProperty { property: String },

    #[error("Properties file error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Malformed properties file{}: {source}", format_context(.context))]
    TomlDecode { source: toml::de::Error, context: Option<Cow<'static, str>> },

    #[error("Failed to encode properties{}: {source}", format_context(.context))]
    TomlEncode { source: toml::ser::Error, context: Option<Cow<'static, str>> },
}

/// Layered loader: one required file, then `FEAST__`-prefixed environment overrides where
/// nested keys are joined with `__` (`FEAST__ONLINE_STORE__LOCAL__PATH` maps to
/// `online_store.local.path`).
///
/// The format follows the file extension (`.yaml`, `.toml`, `.json`).
///
/// # Errors
/// Fails if the file is missing or its content does not match `T`.
pub fn load_config<T>(path: impl AsRef<Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();

    let builder = Config::builder().add_source(File::from(path).required(true)).add_source(
        Environment::with_prefix(ENV_PREFIX).separator("__").convert_case(config::Case::Snake),
    );

    debug!(path = %path.display(), "Loading config");

    let config = builder
        .build()
        .context(format!("Failed to read {}", path.display()))?
        .try_deserialize::<T>()
        .context(format!("Failed to deserialize {}", path.display()))?;

    Ok(config)
}

/// Loads `<repo>/feature_store.yaml` and anchors relative paths at the repository.
///
/// # Errors
/// [`ConfigError::RepoNotFound`] when the repository has no `feature_store.yaml`.
pub fn load_repo_config(repo_path: impl AsRef<Path>) -> Result<RepoConfig, ConfigError> {
    let repo_path = repo_path.as_ref();
    let file = repo_path.join(FEATURE_STORE_YAML);
    if !file.is_file() {
        return Err(ConfigError::RepoNotFound { path: repo_path.to_path_buf() });
    }

    let mut cfg: RepoConfig = load_config(&file)?;

    validate_name("project", &cfg.project).context(FEATURE_STORE_YAML)?;
    cfg.repo_path = std::fs::canonicalize(repo_path).unwrap_or_else(|_| repo_path.to_path_buf());

    info!(
        project = %cfg.project,
        provider = %cfg.provider,
        registry = %cfg.registry_path().display(),
        "Loaded repository config"
    );
    Ok(cfg)
}

/// `$FEAST_CONFIG_PATH`, else `~/.feast/config.toml`, else `.feast/config.toml` when no home
/// directory is known.
#[must_use]
pub fn cli_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from(".feast"), |home| PathBuf::from(home).join(".feast"))
        .join("config.toml")
}

/// Reads CLI properties; a missing file yields the defaults.
pub fn load_cli_properties(path: impl AsRef<Path>) -> Result<CliProperties, ConfigError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).context(format!("{}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CliProperties::default()),
        Err(err) => Err(ConfigError::Io {
            source: err,
            context: Some(format!("Failed to read {}", path.display()).into()),
        }),
    }
}

/// Writes CLI properties, creating the parent directory.
pub fn save_cli_properties(path: impl AsRef<Path>, props: &CliProperties) -> Result<(), ConfigError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(props).context("CLI properties")?;
    std::fs::write(path, raw).context(format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Saved CLI properties");
    Ok(())
}

/// Validates the property name, sets it and persists the file.
pub fn set_cli_property(
    path: impl AsRef<Path>,
    property: &str,
    value: &str,
) -> Result<CliProperties, ConfigError> {
    let path = path.as_ref();
    let mut props = load_cli_properties(path)?;
    if !props.set(property, value) {
        return Err(ConfigError::UnknownProperty { property: property.to_owned() });
    }
    save_cli_properties(path, &props)?;
    Ok(props)
}
