use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{validate_key, KeyValueStore, Result};

/// Volatile store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.items.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();

            assert_eq!(store.get_item("theme").await.unwrap(), None);
            store.set_item("theme", "dark").await.unwrap();
            store.set_item("cart", "[]").await.unwrap();
            assert_eq!(store.get_item("theme").await.unwrap().as_deref(), Some("dark"));
            assert_eq!(store.keys().await.unwrap(), vec!["cart", "theme"]);

            store.remove_item("theme").await.unwrap();
            store.remove_item("theme").await.unwrap();
            assert_eq!(store.get_item("theme").await.unwrap(), None);
        });
    }

    #[test]
    fn test_rejects_bad_keys() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            assert!(store.set_item("../cart", "[]").await.is_err());
            assert!(store.get_item("").await.is_err());
        });
    }
}
