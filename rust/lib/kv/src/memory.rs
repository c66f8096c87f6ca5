use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::KVError;
use crate::traits::KVStore;

/// MemoryKV is a non-persistent KVStore kept in a sorted map.
///
/// Contents are lost when the value is dropped. Batch operations hold the
/// write lock for the whole batch, so readers never observe half of one.
#[derive(Default)]
pub struct MemoryKV {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKV {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> KVError {
        KVError::Storage(format!("memory store lock poisoned: {}", e))
    }
}

impl KVStore for MemoryKV {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.write_batch(&[(key, value)], &[])
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.write_batch(&[], &[key])
    }

    fn write_batch(&self, sets: &[(&str, &[u8])], deletes: &[&str]) -> Result<(), KVError> {
        let mut entries = self.entries.write().map_err(Self::poisoned)?;
        for (key, value) in sets {
            entries.insert(key.to_string(), value.to_vec());
        }
        for key in deletes {
            entries.remove(*key);
        }
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        let mut results = Vec::new();
        for (key, value) in entries.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.clone(), value.clone()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let kv = MemoryKV::new();
        kv.set("a:1", b"one").unwrap();
        assert_eq!(kv.get("a:1").unwrap(), Some(b"one".to_vec()));
        kv.delete("a:1").unwrap();
        assert_eq!(kv.get("a:1").unwrap(), None);
        // Deleting again is fine.
        kv.delete("a:1").unwrap();
    }

    #[test]
    fn scan_is_prefix_bounded_and_sorted() {
        let kv = MemoryKV::new();
        kv.batch_set(&[("b:2", &b"x"[..]), ("a:2", &b"y"[..]), ("a:1", &b"z"[..]), ("ab", &b"w"[..])])
            .unwrap();
        let keys: Vec<String> = kv.scan("a:").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a:1".to_string(), "a:2".to_string()]);
    }

    #[test]
    fn write_batch_sets_then_deletes() {
        let kv = MemoryKV::new();
        kv.set("vote:1:2", b"LIKE").unwrap();
        kv.write_batch(&[("review:1", &b"{}"[..])], &["vote:1:2"]).unwrap();
        assert!(kv.get("vote:1:2").unwrap().is_none());
        assert!(kv.get("review:1").unwrap().is_some());
    }

    #[test]
    fn batch_delete_removes_all() {
        let kv = MemoryKV::new();
        kv.batch_set(&[("k:1", &b"1"[..]), ("k:2", &b"2"[..]), ("k:3", &b"3"[..])]).unwrap();
        kv.batch_delete(&["k:1", "k:3"]).unwrap();
        assert_eq!(kv.len(), 1);
        assert!(kv.get("k:2").unwrap().is_some());
    }
}
