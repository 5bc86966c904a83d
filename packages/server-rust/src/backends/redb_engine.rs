//! Persistent [`KvEngine`] backed by a single redb file.
//!
//! Individual writes commit with [`Durability::None`]: they are visible to
//! later reads immediately but reach disk only at the next `flush`, which
//! commits with [`Durability::Immediate`].

use std::ops::Bound;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use redb::{Database, Durability, ReadableTableMetadata, TableDefinition};

use super::engine::KvEngine;

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("dbzmq");

/// redb-backed ordered storage.
pub struct RedbEngine {
    db: Database,
    path: PathBuf,
}

impl RedbEngine {
    /// Opens `path`, creating the file and the table on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a redb
    /// database.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let db = Database::create(path)
            .with_context(|| format!("cannot open redb file {}", path.display()))?;
        let txn = db.begin_write()?;
        txn.open_table(TABLE)?;
        txn.commit()?;
        tracing::debug!(path = %path.display(), "redb database opened");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn count(&self) -> anyhow::Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        Ok(table.len()?)
    }
}

impl KvEngine for RedbEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::None);
        {
            let mut table = txn.open_table(TABLE)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn remove(&self, key: &[u8]) -> anyhow::Result<bool> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::None);
        let removed = {
            let mut table = txn.open_table(TABLE)?;
            let previous = table.remove(key)?;
            previous.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    fn successor(&self, key: &[u8]) -> anyhow::Result<Option<(Vec<u8>, Vec<u8>)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let lower: Bound<&[u8]> = Bound::Excluded(key);
        let mut range = table.range::<&[u8]>((lower, Bound::Unbounded))?;
        match range.next() {
            Some(entry) => {
                let (k, v) = entry?;
                Ok(Some((k.value().to_vec(), v.value().to_vec())))
            }
            None => Ok(None),
        }
    }

    fn flush(&self) -> anyhow::Result<()> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Immediate);
        txn.commit()?;
        Ok(())
    }

    fn len(&self) -> usize {
        match self.count() {
            Ok(count) => usize::try_from(count).unwrap_or(usize::MAX),
            Err(err) => {
                tracing::warn!(error = %err, "cannot count redb entries");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RedbEngine) {
        let dir = tempfile::tempdir().unwrap();
        let engine = RedbEngine::open(&dir.path().join("test.redb")).unwrap();
        (dir, engine)
    }

    #[test]
    fn put_get_remove() {
        let (_dir, engine) = open_temp();
        engine.put(b"key", b"value").unwrap();
        assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));
        assert_eq!(engine.len(), 1);

        assert!(engine.remove(b"key").unwrap());
        assert!(!engine.remove(b"key").unwrap());
        assert_eq!(engine.get(b"key").unwrap(), None);
        assert!(engine.is_empty());
    }

    #[test]
    fn successor_walks_in_key_order() {
        let (_dir, engine) = open_temp();
        engine.put(b"b", b"2").unwrap();
        engine.put(b"a", b"1").unwrap();

        assert_eq!(
            engine.successor(b"").unwrap(),
            Some((b"a".to_vec(), b"1".to_vec()))
        );
        assert_eq!(
            engine.successor(b"a").unwrap(),
            Some((b"b".to_vec(), b"2".to_vec()))
        );
        assert_eq!(engine.successor(b"b").unwrap(), None);
    }

    #[test]
    fn successor_of_absent_key_is_next_greater() {
        let (_dir, engine) = open_temp();
        for key in [&b"aa"[..], b"ac", b"b"] {
            engine.put(key, key).unwrap();
        }
        assert_eq!(
            engine.successor(b"ab").unwrap(),
            Some((b"ac".to_vec(), b"ac".to_vec()))
        );
        assert_eq!(
            engine.successor(b"a").unwrap(),
            Some((b"aa".to_vec(), b"aa".to_vec()))
        );
    }

    #[test]
    fn flushed_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.redb");
        {
            let engine = RedbEngine::open(&path).unwrap();
            engine.put(b"durable", b"yes").unwrap();
            engine.flush().unwrap();
        }
        let engine = RedbEngine::open(&path).unwrap();
        assert_eq!(engine.get(b"durable").unwrap(), Some(b"yes".to_vec()));
        assert_eq!(engine.path(), path.as_path());
    }

    #[test]
    fn open_rejects_non_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.redb");
        std::fs::write(&path, b"definitely not a redb file, just some text").unwrap();
        assert!(RedbEngine::open(&path).is_err());
    }
}
