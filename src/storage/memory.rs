//! In-memory storage backend.

use super::backend::StorageBackend;
use crate::Result;
use std::collections::HashMap;

/// Storage backend that keeps every namespace in a map.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: HashMap<String, serde_json::Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.data.get(namespace).cloned())
    }

    fn write(&mut self, namespace: &str, value: &serde_json::Value) -> Result<()> {
        self.data.insert(namespace.to_string(), value.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.data.clear();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
