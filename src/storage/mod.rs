pub mod json_backend;
pub mod session_store;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Well-known key the in-progress claim is saved under.
pub const SESSION_KEY: &str = "claimFormData";

/// Durable string key-value store holding at most one value per key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn clear(&self, key: &str) -> Result<()>;
}

/// Process-local store, used by tests and when no data directory is wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Decode("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Decode("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Decode("memory store lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

pub use json_backend::JsonFileStore;
pub use session_store::SessionPersistence;
