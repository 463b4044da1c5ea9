//! JSON file storage backend.
//!
//! All namespaces live in one JSON object at `<data-dir>/store.json`:
//!
//! ```json
//! {"settings": {...}, "tabs": {"12": {...}, "13": {...}}}
//! ```
//!
//! Every write replaces the file atomically (temp file + rename), so a failed
//! write leaves the previous document intact.

use super::backend::StorageBackend;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the store document inside the data directory.
pub const STORE_FILE: &str = "store.json";

/// Storage backend that keeps every namespace in a single JSON file.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `data_dir`. The file is created on first write.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(Error::Other(format!(
                "Store document is not a JSON object: {}",
                self.path.display()
            ))),
        }
    }

    fn store(&self, map: &serde_json::Map<String, serde_json::Value>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::Other("Store path has no parent directory".to_string()))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, map)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.load()?.remove(namespace))
    }

    fn write(&mut self, namespace: &str, value: &serde_json::Value) -> Result<()> {
        let mut map = self.load()?;
        map.insert(namespace.to_string(), value.clone());
        self.store(&map)
    }

    fn clear(&mut self) -> Result<()> {
        self.store(&serde_json::Map::new())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}
