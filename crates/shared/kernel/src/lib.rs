//! Kernel utilities shared across slices: repository and CLI configuration loading.
//!
//! ```rust,no_run
//! use feast_kernel::config::load_repo_config;
//!
//! let cfg = load_repo_config("feature_repo").unwrap();
//! println!("{} -> {}", cfg.project, cfg.registry_path().display());
//! ```

pub mod config;

pub use feast_domain as domain;
