//! Web Storage behind the core's key-value seam.
//!
//! Values are stored as raw strings, not JSON-wrapped, so entries written by
//! other page scripts stay readable.

use gloo_storage::{LocalStorage, SessionStorage, Storage};
use peek_preview_core::{KeyValueStore, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebStore {
    /// Survives browser restarts. Holds settings.
    Local,
    /// Scoped to the tab. Holds the session snapshot.
    Session,
}

impl WebStore {
    fn raw(self) -> web_sys::Storage {
        match self {
            WebStore::Local => LocalStorage::raw(),
            WebStore::Session => SessionStorage::raw(),
        }
    }
}

impl KeyValueStore for WebStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.raw()
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.raw()
            .set_item(key, value)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                message: format!("{:?}", e),
            })
    }

    fn remove(&mut self, key: &str) {
        if let Err(e) = self.raw().remove_item(key) {
            tracing::debug!("Storage remove failed for {}: {:?}", key, e);
        }
    }
}
