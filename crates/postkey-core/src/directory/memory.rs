#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use super::DirectoryStore;
use crate::{PersonIdentifier, PersonRecord, Result};

/// In-memory directory.
///
/// Thread-safe via Arc<Mutex<_>>. Clone shares the same records.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<HashMap<PersonIdentifier, PersonRecord>>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("MemoryDirectory mutex poisoned").len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DirectoryStore for MemoryDirectory {
    fn get(&self, identifier: &PersonIdentifier) -> Result<Option<PersonRecord>> {
        let records = self.inner.lock().expect("MemoryDirectory mutex poisoned");
        Ok(records.get(identifier).cloned())
    }

    fn put(&self, record: PersonRecord) -> Result<PersonRecord> {
        let mut records = self.inner.lock().expect("MemoryDirectory mutex poisoned");

        match records.get_mut(&record.identifier) {
            Some(existing) => {
                existing.merge(record)?;
                Ok(existing.clone())
            },
            None => {
                records.insert(record.identifier.clone(), record.clone());
                Ok(record)
            },
        }
    }

    fn records(&self) -> Result<Vec<PersonRecord>> {
        let records = self.inner.lock().expect("MemoryDirectory mutex poisoned");
        Ok(records.values().cloned().collect())
    }
}
