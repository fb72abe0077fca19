//! In-memory key-value registry shared by both ingress paths.
//!
//! Each operation takes the lock for its own duration only and never across an
//! `.await`, so every call is atomic with respect to every other call and
//! readers never observe a partially applied write.

use indexmap::IndexMap;
use kvgate::Snapshot;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Key '{0}' not found.")]
    NotFound(String),
}

/// Cheaply clonable handle; clones share the same entries.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<IndexMap<String, String>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An overwritten key keeps its enumeration position.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Point-in-time copy of every entry, in insertion order.
    pub fn get_all(&self) -> Snapshot {
        self.entries.read().clone()
    }

    /// Remove `key`, returning its last value.
    pub fn delete(&self, key: &str) -> Result<String, RegistryError> {
        self.entries
            .write()
            .shift_remove(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
