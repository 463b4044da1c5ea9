//! Storage backend trait and implementations.
//!
//! This module provides different storage backends for Tab Trail data:
//! - `MemoryBackend` - Process-local map, gone on exit (tests, throwaway sessions)
//! - `FileBackend` - Single JSON document on disk (default)
//! - `SqliteBackend` - One row per namespace in a SQLite database

use crate::Result;

/// Trait for storage backends that handle raw data persistence.
///
/// A backend is a namespaced key-value store of JSON documents, mirroring the
/// extension's local storage area: the `tabs` namespace holds one map of all
/// tab records, `settings` holds one settings object.
pub trait StorageBackend: Send {
    /// Read the document stored under `namespace`, if any.
    fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>>;

    /// Replace the document stored under `namespace`.
    fn write(&mut self, namespace: &str, value: &serde_json::Value) -> Result<()>;

    /// Remove every namespace.
    fn clear(&mut self) -> Result<()>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// Available storage backend types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendType {
    /// In-memory storage, discarded on exit
    Memory,
    /// JSON document storage (default) - <data-dir>/store.json
    #[default]
    File,
    /// SQLite storage - <data-dir>/store.db
    Sqlite,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "file" | "json" | "default" => Some(Self::File),
            "sqlite" | "db" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }

    /// Whether data written through this backend outlives the process.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown backend: {} (expected memory, file, sqlite)", s))
    }
}
