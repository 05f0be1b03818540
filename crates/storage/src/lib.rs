//! Device-local key-value storage for the Loja client
//!
//! Values are opaque strings stored under string keys and survive process
//! restarts when a [`FileStore`] is used. [`JsonStore`] layers typed JSON
//! access on top of any [`KeyValueStore`].

mod file;
mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string key-value store.
///
/// Implementations must be safe to share between tasks. Every call is a
/// complete operation; there are no transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// List every stored key
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Keys may only contain ASCII alphanumerics, `_`, `-` and `.`, and may not
/// start with a dot.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Typed JSON view over a [`KeyValueStore`]
#[derive(Clone)]
pub struct JsonStore {
    inner: Arc<dyn KeyValueStore>,
}

impl JsonStore {
    /// Wrap a store
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// An in-memory store, mostly useful for tests
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Access the underlying raw store
    pub fn raw(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner
    }

    /// Read and deserialize the value under `key`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.inner.get_item(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.inner.set_item(key, &raw).await
    }

    /// Read the raw string under `key`
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_item(key).await
    }

    /// Store a raw string under `key`
    pub async fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_item(key, value).await
    }

    /// Delete `key`
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key).await
    }
}

impl std::fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore").finish_non_exhaustive()
    }
}
