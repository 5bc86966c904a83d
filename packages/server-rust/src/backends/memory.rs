//! In-memory [`KvEngine`] backed by a [`BTreeMap`].
//!
//! Ordered so `walk` works; nothing survives a restart and `flush` is a no-op.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use super::engine::KvEngine;

/// Ordered in-memory storage.
pub struct MemoryEngine {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    /// Creates a new, empty `MemoryEngine`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KvEngine for MemoryEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn remove(&self, key: &[u8]) -> anyhow::Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn successor(&self, key: &[u8]) -> anyhow::Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entries = self.entries.read();
        let next = entries
            .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()));
        Ok(next)
    }

    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
