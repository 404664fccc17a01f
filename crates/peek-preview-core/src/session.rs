//! Last displayed state, kept across page reloads.
//!
//! Written once on teardown and read once on load so a reload (including
//! the one forced by a dropped connection) shows the previous content
//! instead of a blank page. Never authoritative: the next `show` wins.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::store::KeyValueStore;

pub const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl SessionSnapshot {
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StorageError> {
        let Some(raw) = store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
            key: SESSION_KEY.to_string(),
            source,
        })?;
        tracing::debug!(target: "peek::session", "session snapshot loaded");
        Ok(Some(snapshot))
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let raw = serde_json::to_string(self).map_err(|source| StorageError::Malformed {
            key: SESSION_KEY.to_string(),
            source,
        })?;
        store.set(SESSION_KEY, &raw)?;
        tracing::debug!(
            target: "peek::session",
            bytes = raw.len(),
            line = ?self.line,
            "session snapshot saved"
        );
        Ok(())
    }
}
