//! Key/value blob collaborator used for cross-session persistence.
//!
//! The engine only ever reads and writes keys under its own namespace
//! prefix. Values are opaque strings (JSON in practice).

use std::collections::BTreeMap;

use crate::error::Result;

pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Remove every key starting with `prefix`; returns how many went.
    fn remove_all_with_prefix(&mut self, prefix: &str) -> Result<usize>;
}

/// Process-local blob store. Useful for tests and for running without disk.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    entries: BTreeMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_all_with_prefix(&mut self, prefix: &str) -> Result<usize> {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        Ok(before - self.entries.len())
    }
}
