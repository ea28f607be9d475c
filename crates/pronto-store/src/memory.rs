//! In-process key-value store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::{validate_key, KeyValueStore, StoreResult};

/// A store backed by a `HashMap`. Contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        MemoryStore {
            entries: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("pos_carrito").unwrap(), None);

        store.set("pos_carrito", "[]").unwrap();
        store.set("pos_carrito", "[1]").unwrap();
        assert_eq!(store.get("pos_carrito").unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.len(), 1);

        store.remove("pos_carrito").unwrap();
        store.remove("pos_carrito").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_rejects_bad_keys() {
        let store = MemoryStore::new();
        assert!(store.set("../x", "v").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_memory_store_with_entries() {
        let store = MemoryStore::with_entries([("pos_cliente", "{}")]);
        assert_eq!(store.get("pos_cliente").unwrap().as_deref(), Some("{}"));
    }
}
