use crate::engine::Storage;
use crate::error::StorageError;
use std::fmt;
use std::path::Path;

/// A validated, lowercased namespace name (`[a-z0-9_]+`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceName(String);

impl TryFrom<String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&str> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        let name = value.to_lowercase();

        if name.is_empty() {
            return Err(StorageError::InvalidNamespace {
                message: "EMPTY".into(),
                context: Some("Namespace cannot be empty".into()),
            });
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StorageError::InvalidNamespace {
                message: name.into(),
                context: Some("Namespace contains illegal characters".into()),
            });
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scoped view of the storage engine where every file is sharded below `<root>/<namespace>/`.
///
/// Subdirectories in the given path are kept; only the final file name is sharded, so
/// `driver_hourly_stats/9f86d081` lands at `<ns>/driver_hourly_stats/9f/86/9f86d081`.
/// Cloning is cheap and shares the parent [`Storage`] configuration.
#[derive(Debug, Clone)]
pub struct NamespacedStorage {
    storage: Storage,
    namespace: NamespaceName,
}

impl NamespacedStorage {
    pub(crate) const fn new(storage: Storage, namespace: NamespaceName) -> Self {
        Self { storage, namespace }
    }

    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the path does not exist.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.storage.read_internal(Some(&self.namespace), path).await
    }

    /// Atomic write, see [`Storage::write`].
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.storage.write_internal(Some(&self.namespace), path, data).await
    }

    /// Removes `dir` and everything below it. Returns `false` if it did not exist.
    pub async fn remove_dir(&self, dir: impl AsRef<Path>) -> Result<bool, StorageError> {
        let relative = Path::new(self.namespace.as_ref()).join(dir);
        self.storage.remove_tree(relative).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercased() {
        let ns = NamespaceName::try_from("Driver_Ranking").unwrap();
        assert_eq!(ns.as_ref(), "driver_ranking");
        assert_eq!(ns.to_string(), "driver_ranking");
    }

    #[test]
    fn illegal_names_are_rejected() {
        for bad in ["", "a/b", "..", "with space", "dash-ed"] {
            let err = NamespaceName::try_from(bad).unwrap_err();
            assert_eq!(err.kind(), "InvalidNamespace", "{bad:?}");
        }
    }
}
