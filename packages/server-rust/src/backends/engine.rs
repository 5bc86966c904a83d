//! Byte-keyed ordered storage trait underneath the built-in backends.
//!
//! [`KvEngine`] is the innermost layer: it stores and orders raw keys and
//! knows nothing about framing or continuations. [`KvBackend`](super::KvBackend)
//! turns any engine into an operation table.

/// Ordered key-value storage over raw bytes.
///
/// All operations are synchronous. Keys compare lexicographically.
pub trait KvEngine: Send + Sync + 'static {
    /// Insert or replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write could not be applied.
    fn put(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()>;

    /// Value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the read failed.
    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;

    /// Remove `key`. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal could not be applied.
    fn remove(&self, key: &[u8]) -> anyhow::Result<bool>;

    /// The first entry whose key sorts strictly after `key`.
    ///
    /// An empty `key` yields the first entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan failed.
    fn successor(&self, key: &[u8]) -> anyhow::Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Make every write applied so far durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync failed.
    fn flush(&self) -> anyhow::Result<()>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether the engine stores nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
