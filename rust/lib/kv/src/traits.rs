use crate::error::KVError;

/// KVStore provides a key-value storage interface.
///
/// Keys follow a namespaced convention: `film:film:00000000000000000007`,
/// `film:friend:1:2`, etc. `scan` returns entries sorted by key.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Apply sets and deletes in one write transaction: all of them land
    /// or none do. Deletes are applied after sets.
    fn write_batch(&self, sets: &[(&str, &[u8])], deletes: &[&str]) -> Result<(), KVError>;

    /// Set several entries in one write transaction.
    fn batch_set(&self, entries: &[(&str, &[u8])]) -> Result<(), KVError> {
        self.write_batch(entries, &[])
    }

    /// Delete several keys in one write transaction.
    fn batch_delete(&self, keys: &[&str]) -> Result<(), KVError> {
        self.write_batch(&[], keys)
    }

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}
