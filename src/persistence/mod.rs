//! Key-value persistence
//!
//! Calibration, settings and best times are stored as JSON strings under
//! fixed keys. Browsers use LocalStorage; everything else (and tests) uses
//! the in-memory store. No game logic depends on the medium.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{MazeError, Result};

/// String-keyed storage for JSON documents
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str);
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
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

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    /// None when the page has no LocalStorage (private mode, sandboxed iframe)
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        Some(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| MazeError::Storage(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) {
        let _ = self.storage.remove_item(key);
    }
}

/// Read and decode a JSON document; missing or corrupt entries yield None
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let json = store.get(key)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring corrupt entry '{}': {}", key, e);
            None
        }
    }
}

/// Encode and write a JSON document
pub fn save_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json).map_err(|e| match e {
        MazeError::Storage(msg) => MazeError::Storage(format!("{key}: {msg}")),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        value: u32,
    }

    #[test]
    fn test_json_roundtrip_through_store() {
        let mut store = MemoryStore::new();
        let doc = Doc {
            name: "a".into(),
            value: 3,
        };
        save_json(&mut store, "doc", &doc).unwrap();
        assert_eq!(load_json::<Doc>(&store, "doc"), Some(doc));
        store.remove("doc");
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_ignored() {
        let mut store = MemoryStore::new();
        store.set("doc", "{not json").unwrap();
        assert_eq!(load_json::<Doc>(&store, "doc"), None);
        assert_eq!(load_json::<Doc>(&store, "missing"), None);
    }
}
