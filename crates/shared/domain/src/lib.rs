//! # Domain Models
//!
//! Data types shared by every feature store crate: value types and values, entity keys,
//! entities, feature views, feature references and the repository configuration.
//! No I/O lives here; parsing helpers for the textual forms users type (labels, timestamps,
//! feature references) do.

pub mod config;
pub mod entity;
pub mod entity_key;
pub mod error;
pub mod feature_ref;
pub mod feature_view;
pub mod labels;
pub mod names;
pub mod time;
pub mod value;

pub use entity::Entity;
pub use entity_key::EntityKey;
pub use error::{DomainError, DomainErrorExt};
pub use feature_ref::FeatureRef;
pub use feature_view::{Feature, FeatureView, FileFormat, FileSource, MaterializationInterval};
pub use value::{Value, ValueType};
