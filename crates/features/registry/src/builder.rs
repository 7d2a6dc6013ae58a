use crate::error::{RegistryError, RegistryErrorExt};
use crate::{Registry, RegistryInner};
use feast_domain::config::DEFAULT_REGISTRY_CACHE_TTL_SECONDS;
use feast_storage::{Compression, Storage};
use moka::sync::Cache;
use private::Sealed;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct NoPath;
#[derive(Debug)]
pub struct WithPath(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoPath {}
impl Sealed for WithPath {}

#[allow(private_bounds)]
#[derive(Debug)]
pub struct RegistryBuilder<S: Sealed = NoPath> {
    state: S,
    cache_ttl: Duration,
}

impl Default for RegistryBuilder<NoPath> {
    fn default() -> Self {
        Self { state: NoPath, cache_ttl: Duration::from_secs(DEFAULT_REGISTRY_CACHE_TTL_SECONDS) }
    }
}

impl RegistryBuilder<NoPath> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry file location, e.g. `<repo>/data/metadata.db`.
    #[must_use]
    pub fn path(self, path: impl Into<PathBuf>) -> RegistryBuilder<WithPath> {
        RegistryBuilder { state: WithPath(path.into()), cache_ttl: self.cache_ttl }
    }
}

#[allow(private_bounds)]
impl<S: Sealed> RegistryBuilder<S> {
    /// How long a read snapshot is served from memory. Zero disables the cache.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

impl RegistryBuilder<WithPath> {
    /// Opens the storage directory holding the registry file. The file itself is created by
    /// the first mutation.
    pub async fn open(self) -> Result<Registry, RegistryError> {
        let path = self.state.0;
        let file_name = path.file_name().map(PathBuf::from).ok_or_else(|| RegistryError::Internal {
            message: format!("'{}' is not a file path", path.display()).into(),
            context: Some("registry path".into()),
        })?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));

        let storage = Storage::builder()
            .root(dir)
            .create(true)
            .compression(Compression::Lz4)
            .connect()
            .await
            .context("Failed to open registry directory")?;

        let cache = (!self.cache_ttl.is_zero())
            .then(|| Cache::builder().max_capacity(1).time_to_live(self.cache_ttl).build());

        debug!(path = %path.display(), cache_ttl = ?self.cache_ttl, "Registry opened");

        Ok(Registry {
            inner: Arc::new(RegistryInner {
                storage,
                file_name,
                path,
                cache,
                write_lock: Mutex::new(()),
            }),
        })
    }
}
