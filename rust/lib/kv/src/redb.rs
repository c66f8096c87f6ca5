use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};

use crate::error::KVError;
use crate::traits::KVStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: std::fmt::Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// RedbStore is a KVStore implementation backed by redb, a pure-Rust embedded
/// key-value database.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(storage)?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        tracing::debug!(path = %path.display(), "opened redb store");
        Ok(Self {
            db: Arc::new(db),
        })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        match table.get(key) {
            Ok(Some(val)) => Ok(Some(val.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(storage(e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.write_batch(&[(key, value)], &[])
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.write_batch(&[], &[key])
    }

    fn write_batch(&self, sets: &[(&str, &[u8])], deletes: &[&str]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            for (key, value) in sets {
                table.insert(*key, *value).map_err(storage)?;
            }
            for key in deletes {
                table.remove(*key).map_err(storage)?;
            }
        }
        // Dropping an uncommitted transaction aborts it.
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        let iter = table.range(prefix..).map_err(storage)?;

        for entry in iter {
            let (key, value) = entry.map_err(storage)?;
            let key = key.value().to_string();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key, value.value().to_vec()));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("test.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn roundtrip_and_delete() {
        let (_dir, store) = open_temp();
        store.set("film:1", b"alien").unwrap();
        assert_eq!(store.get("film:1").unwrap(), Some(b"alien".to_vec()));
        store.delete("film:1").unwrap();
        assert_eq!(store.get("film:1").unwrap(), None);
    }

    #[test]
    fn scan_stops_at_prefix_boundary() {
        let (_dir, store) = open_temp();
        store
            .batch_set(&[("like:1:2", &b""[..]), ("like:1:3", &b""[..]), ("likes", &b""[..]), ("user:1", &b""[..])])
            .unwrap();
        let keys: Vec<String> = store.scan("like:").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["like:1:2".to_string(), "like:1:3".to_string()]);
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("persist.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.set("user:7", b"bob").unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("user:7").unwrap(), Some(b"bob".to_vec()));
    }
}
