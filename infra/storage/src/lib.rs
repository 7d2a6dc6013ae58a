//! Sandboxed file storage shared by the feature registry and the local online store.
//!
//! Every path handed to the engine is relative to a canonical root and is checked against
//! traversal before it touches the disk. Writes go through a unique temp file, `fsync` and
//! `rename`, so readers never observe a half-written registry or feature row.
//!
//! # Layout
//!
//! - Files written through [`Storage`] live directly under the root (`metadata.db`).
//! - Files written through a [`NamespacedStorage`] live under `<root>/<namespace>/` and are
//!   sharded by the first four characters of their file name, keeping directories small when a
//!   feature view holds millions of entity rows:
//!   `<root>/driver_ranking/driver_hourly_stats/9f/86/9f86d081...`.
//! - Stale temp files from crashed writers are purged when the engine connects.
//!
//! # Examples
//!
//! ```rust
//! use feast_storage::{Compression, Storage, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("data");
//!     let storage = Storage::builder()
//!         .root(&root)
//!         .create(true)
//!         .compression(Compression::Lz4)
//!         .connect()
//!         .await?;
//!
//!     storage.write("metadata.db", b"registry bytes").await?;
//!     assert_eq!(storage.read("metadata.db").await?, b"registry bytes");
//!
//!     let project = storage.namespace("driver_ranking")?;
//!     project.write("driver_hourly_stats/9f86d081", b"row").await?;
//!     assert_eq!(project.read("driver_hourly_stats/9f86d081").await?, b"row");
//!
//!     assert!(storage.remove_namespace("driver_ranking").await?);
//!
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod namespace;
mod security;

pub use builder::StorageBuilder;
pub use engine::{Compression, Storage};
pub use error::{StorageError, StorageErrorExt};
pub use namespace::{NamespaceName, NamespacedStorage};
