//! Key-value store interface and in-memory implementation

use super::super::errors::SubspacesResult;
use std::collections::BTreeMap;

/// Byte-keyed ordered key-value store supplied by the host
pub trait KvStore {
    /// Read the value stored under `key`
    fn get(&self, key: &[u8]) -> SubspacesResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &[u8], value: &[u8]) -> SubspacesResult<()>;

    /// Check whether `key` holds a value
    fn has(&self, key: &[u8]) -> SubspacesResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Remove `key`; removing a missing key is not an error
    fn delete(&mut self, key: &[u8]) -> SubspacesResult<()>;

    /// All entries whose key starts with `prefix`, in ascending key order
    fn prefix_scan(&self, prefix: &[u8]) -> SubspacesResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get(&self, key: &[u8]) -> SubspacesResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> SubspacesResult<()> {
        (**self).set(key, value)
    }

    fn has(&self, key: &[u8]) -> SubspacesResult<bool> {
        (**self).has(key)
    }

    fn delete(&mut self, key: &[u8]) -> SubspacesResult<()> {
        (**self).delete(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> SubspacesResult<Vec<(Vec<u8>, Vec<u8>)>> {
        (**self).prefix_scan(prefix)
    }
}

/// In-memory store backed by a `BTreeMap`
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
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

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> SubspacesResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> SubspacesResult<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn has(&self, key: &[u8]) -> SubspacesResult<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn delete(&mut self, key: &[u8]) -> SubspacesResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> SubspacesResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut store = MemoryStore::new();
        store.set(b"a", b"1").unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(store.has(b"a").unwrap());

        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        assert!(!store.has(b"a").unwrap());

        // Deleting a missing key is fine
        store.delete(b"a").unwrap();
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let mut store = MemoryStore::new();
        store.set(&[1, 2, 3], b"c").unwrap();
        store.set(&[1, 2, 1], b"a").unwrap();
        store.set(&[1, 3], b"x").unwrap();
        store.set(&[1, 2], b"p").unwrap();
        store.set(&[0, 2, 2], b"y").unwrap();

        let keys: Vec<Vec<u8>> = store
            .prefix_scan(&[1, 2])
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![vec![1, 2], vec![1, 2, 1], vec![1, 2, 3]]);
    }

    #[test]
    fn test_boxed_store_forwards() {
        let mut store: Box<dyn KvStore> = Box::new(MemoryStore::new());
        store.set(b"k", b"v").unwrap();
        assert!(store.has(b"k").unwrap());
        assert_eq!(store.prefix_scan(b"").unwrap().len(), 1);
    }

    #[test]
    fn test_prefix_scan_with_high_bytes() {
        let mut store = MemoryStore::new();
        store.set(&[0xFF, 0xFF, 0x01], b"a").unwrap();
        store.set(&[0xFF, 0xFE], b"b").unwrap();

        assert_eq!(store.prefix_scan(&[0xFF, 0xFF]).unwrap().len(), 1);
        assert_eq!(store.prefix_scan(&[0xFF]).unwrap().len(), 2);
    }
}
