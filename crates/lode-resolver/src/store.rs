//! In-memory store for archives extracted from inside other archives.
//!
//! Equally-named nested archives from different parents must not collide, so
//! every stored archive gets a fresh unique key. The store lives for the
//! whole loader process and acts as a cache across resolution calls: the
//! per-parent extraction list is computed once, and stored entries are never
//! mutated.
//!
//! The store is plain shared state — construct it once, wrap it in an `Arc`,
//! and pass it to every resolver that should share the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::candidate::Origin;
use crate::error::ResolveError;

#[derive(Debug, Default)]
pub struct ArchiveStore {
    /// Store key → archive bytes.
    archives: Mutex<HashMap<String, Arc<Vec<u8>>>>,
    /// Parent origin → store keys of its extracted nested archives.
    nested: Mutex<HashMap<String, Vec<String>>>,
    /// Origin → human-readable path (`parent!inner` for nested archives).
    readable: Mutex<HashMap<String, String>>,
}

impl ArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored archive's bytes.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.archives.lock().unwrap().get(key).cloned()
    }

    /// Store archive bytes under a fresh unique key and return it.
    pub fn store_archive(&self, bytes: Vec<u8>) -> String {
        let key = format!("memory:{}.zip", Uuid::new_v4());
        self.archives
            .lock()
            .unwrap()
            .insert(key.clone(), Arc::new(bytes));
        key
    }

    /// Record the readable path for an origin key.
    pub fn set_readable(&self, origin: String, readable: String) {
        self.readable.lock().unwrap().insert(origin, readable);
    }

    /// The readable path recorded for an origin, falling back to its display
    /// form.
    pub fn readable_path(&self, origin: &Origin) -> String {
        let key = origin.to_string();
        self.readable
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(key)
    }

    /// Compute-once nested extraction for one parent origin.
    ///
    /// The first caller runs `extract` (which stores archives and readable
    /// paths as it goes) and its result is cached; later callers for the
    /// same parent get the cached keys without re-extracting. The lock is
    /// held across extraction so concurrent callers cannot race to duplicate
    /// entries under distinct keys.
    pub fn nested_for<F>(&self, parent: &str, extract: F) -> Result<Vec<String>, ResolveError>
    where
        F: FnOnce(&ArchiveStore) -> Result<Vec<String>, ResolveError>,
    {
        let mut nested = self.nested.lock().unwrap();
        if let Some(keys) = nested.get(parent) {
            return Ok(keys.clone());
        }
        let keys = extract(self)?;
        nested.insert(parent.to_string(), keys.clone());
        Ok(keys)
    }

    /// Number of archives currently stored.
    pub fn len(&self) -> usize {
        self.archives.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get() {
        let store = ArchiveStore::new();
        let key = store.store_archive(vec![1, 2, 3]);
        assert!(key.starts_with("memory:"));
        assert_eq!(store.get(&key).unwrap().as_slice(), &[1, 2, 3]);
        assert!(store.get("memory:missing.zip").is_none());
    }

    #[test]
    fn test_unique_keys() {
        let store = ArchiveStore::new();
        let a = store.store_archive(vec![0]);
        let b = store.store_archive(vec![0]);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_nested_extraction_runs_once() {
        let store = ArchiveStore::new();
        let first = store
            .nested_for("mods/parent.zip", |s| Ok(vec![s.store_archive(vec![1])]))
            .unwrap();
        let second = store
            .nested_for("mods/parent.zip", |_| {
                panic!("extraction must not run twice for one parent")
            })
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_readable_paths() {
        let store = ArchiveStore::new();
        let origin = Origin::Store("memory:abc.zip".to_string());
        assert_eq!(store.readable_path(&origin), "memory:abc.zip");
        store.set_readable(
            "memory:abc.zip".to_string(),
            "mods/parent.zip!nested/lib.zip".to_string(),
        );
        assert_eq!(store.readable_path(&origin), "mods/parent.zip!nested/lib.zip");
    }
}
