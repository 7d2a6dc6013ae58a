//! # Runtime
//!
//! Standardized [Tokio](https://tokio.rs) runtime profiles for the feature store binaries.
//!
//! ## Profiles
//! * **Interactive**: registry and lookup commands. Few workers, small stacks, short keep-alive.
//! * **Batch**: materialization and bulk online writes. One worker per core, longer keep-alive.
//!
//! Both size their pool from `FEAST_WORKER_THREADS`, falling back to available parallelism.
//!
//! ## Example
//!
//! ```rust
//! use feast_runtime::{RuntimeConfig, build_runtime_with_config};
//!
//! let rt = build_runtime_with_config(&RuntimeConfig::batch()).unwrap();
//! assert_eq!(rt.block_on(async { 21 * 2 }), 42);
//! ```

use anyhow::{Result, anyhow};
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Fallback worker count when parallelism cannot be detected.
const DEFAULT_WORKER_THREADS: usize = 4;
/// Upper bound for interactive commands; they mostly wait on small file reads.
const INTERACTIVE_WORKER_THREADS: usize = 2;
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 1024 * 1024;
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
const MAX_WORKER_THREADS: usize = 1024;
const DEFAULT_THREAD_NAME: &str = "feast-worker";

static WORKER_THREADS: OnceLock<usize> = OnceLock::new();

fn detected_worker_threads() -> usize {
    *WORKER_THREADS.get_or_init(|| {
        std::env::var("FEAST_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= MAX_WORKER_THREADS)
            .unwrap_or_else(|| {
                available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

/// Configuration for the Tokio runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl RuntimeConfig {
    /// Preset for short-lived CLI commands (apply, describe, online lookups).
    #[must_use]
    pub fn interactive() -> Self {
        Self {
            worker_threads: detected_worker_threads().min(INTERACTIVE_WORKER_THREADS),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "feast-cli".to_owned(),
            thread_keep_alive: Duration::from_secs(10),
        }
    }

    /// Preset for materialization jobs that fan out online writes.
    #[must_use]
    pub fn batch() -> Self {
        Self {
            worker_threads: detected_worker_threads(),
            stack_size: 4 * 1024 * 1024,
            thread_name: "feast-batch".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, MAX_WORKER_THREADS);
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.thread_name = if name.trim().is_empty() { DEFAULT_THREAD_NAME.to_owned() } else { name };
        self
    }

    /// Clamps every field into its supported range.
    fn normalized(&self) -> Self {
        self.clone()
            .with_worker_threads(self.worker_threads)
            .with_stack_size(self.stack_size)
            .with_thread_name(self.thread_name.clone())
    }
}

/// Builds a multi-threaded runtime with I/O and timers enabled.
///
/// # Errors
///
/// Returns an error if the OS refuses to spawn the worker threads.
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(
        workers = config.worker_threads,
        stack = config.stack_size,
        name = %config.thread_name,
        "Building tokio runtime"
    );

    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .map_err(|e| anyhow!("Failed to initialize runtime: {e}"))
}
