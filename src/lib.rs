//! Tab Trail - tab provenance tracking for browser extensions.
//!
//! This library provides the core functionality for the `tt` CLI tool and for
//! extension hosts embedding the engine:
//! - `tracker` infers parent-child relationships between tabs from browser events
//! - `storage` persists tab records and reconstructs trails across ancestor chains
//! - `service` exposes the request/response message interface used by the popup
//!   and explorer pages

pub mod browser;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod events;
pub mod models;
pub mod service;
pub mod storage;
pub mod tracker;
pub mod urls;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::clock::ManualClock;
    use crate::storage::{MemoryBackend, Storage, StorageBackend};
    use crate::{Error, Result};

    /// Epoch milliseconds every test clock starts at (2026-01-01T00:00:00Z).
    pub const T0: i64 = 1_767_225_600_000;

    /// Test environment with an in-memory store and a hand-driven clock.
    pub struct TestEnv {
        pub clock: Arc<ManualClock>,
        pub storage: Storage,
    }

    impl TestEnv {
        /// Create a new environment with the clock at [`T0`].
        pub fn new() -> Self {
            let clock = Arc::new(ManualClock::new(T0));
            let storage = Storage::new(Box::new(MemoryBackend::new()), clock.clone());
            Self { clock, storage }
        }

        /// Create an environment whose writes fail once `budget` runs out.
        pub fn flaky(budget: &WriteBudget) -> Self {
            let clock = Arc::new(ManualClock::new(T0));
            let storage = Storage::new(Box::new(FlakyBackend::new(budget)), clock.clone());
            Self { clock, storage }
        }

        /// Move the clock forward by `ms` milliseconds.
        pub fn advance(&self, ms: i64) {
            self.clock.advance(ms);
        }
    }

    /// Number of writes a [`FlakyBackend`] still accepts.
    #[derive(Clone)]
    pub struct WriteBudget(Arc<AtomicUsize>);

    impl WriteBudget {
        pub fn unlimited() -> Self {
            Self(Arc::new(AtomicUsize::new(usize::MAX)))
        }

        pub fn set(&self, writes: usize) {
            self.0.store(writes, Ordering::SeqCst);
        }

        fn take(&self) -> bool {
            self.0
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    /// In-memory backend whose writes fail when its budget is spent.
    pub struct FlakyBackend {
        inner: MemoryBackend,
        budget: WriteBudget,
    }

    impl FlakyBackend {
        pub fn new(budget: &WriteBudget) -> Self {
            Self {
                inner: MemoryBackend::new(),
                budget: budget.clone(),
            }
        }
    }

    impl StorageBackend for FlakyBackend {
        fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>> {
            self.inner.read(namespace)
        }

        fn write(&mut self, namespace: &str, value: &serde_json::Value) -> Result<()> {
            if !self.budget.take() {
                return Err(Error::Other("disk full".to_string()));
            }
            self.inner.write(namespace, value)
        }

        fn clear(&mut self) -> Result<()> {
            self.inner.clear()
        }

        fn location(&self) -> String {
            "flaky".to_string()
        }

        fn backend_type(&self) -> &'static str {
            "flaky"
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for Tab Trail operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(#[from] kdl::KdlError),

    #[error("Not initialized: run `tt init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tab lookup failed: {0}")]
    TabLookup(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Tab Trail operations.
pub type Result<T> = std::result::Result<T, Error>;
