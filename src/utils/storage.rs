use std::cell::RefCell;
use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::SyncError;

/// Durable string key-value storage (localStorage in the browser)
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SyncError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), SyncError>;
    fn remove_item(&self, key: &str) -> Result<(), SyncError>;
}

pub fn save_to_storage<T: Serialize>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), SyncError> {
    let json = serde_json::to_string(value)
        .map_err(|e| SyncError::Storage(format!("serializing {}: {}", key, e)))?;
    storage.set_item(key, &json)
}

/// Reads and decodes `key`; a corrupt entry is reported as `SyncError::Parse`
pub fn load_from_storage<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, SyncError> {
    match storage.get_item(key)? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| SyncError::Parse(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// In-memory storage, used when localStorage is unavailable (private mode)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), SyncError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::{get_local_storage, LocalStorage};

#[cfg(target_arch = "wasm32")]
mod browser {
    use web_sys::{window, Storage};

    use super::KeyValueStorage;
    use crate::errors::SyncError;

    pub fn get_local_storage() -> Option<Storage> {
        window()?.local_storage().ok()?
    }

    /// `window.localStorage`
    pub struct LocalStorage {
        storage: Storage,
    }

    impl LocalStorage {
        /// `None` when the browser denies access to localStorage
        pub fn open() -> Option<Self> {
            get_local_storage().map(|storage| Self { storage })
        }
    }

    impl KeyValueStorage for LocalStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, SyncError> {
            self.storage
                .get_item(key)
                .map_err(|_| SyncError::Storage(format!("reading {} from localStorage", key)))
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), SyncError> {
            self.storage
                .set_item(key, value)
                .map_err(|_| SyncError::Storage(format!("writing {} to localStorage", key)))
        }

        fn remove_item(&self, key: &str) -> Result<(), SyncError> {
            self.storage
                .remove_item(key)
                .map_err(|_| SyncError::Storage(format!("removing {} from localStorage", key)))
        }
    }
}
