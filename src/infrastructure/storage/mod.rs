//! In-memory metadata store

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

/// Process-wide mergeable key-value state, fed by the reserved meta-update
/// event category. Holds identity attributes such as the bot's current nick.
///
/// Updates are shallow merges: keys present in an update overwrite, keys
/// absent from it are left untouched. There is no delete operation.
pub struct MetaStore {
    inner: RwLock<HashMap<String, Value>>,
}

impl MetaStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Apply a shallow key-wise overwrite
    pub fn merge(&self, partial: Map<String, Value>) {
        match self.inner.write() {
            Ok(mut inner) => {
                for (key, value) in partial {
                    inner.insert(key, value);
                }
            }
            Err(_) => warn!("Meta store lock poisoned, dropping update"),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().ok()?.get(key).cloned()
    }

    /// Get a string value by key
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Current contents, cloned
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner
            .read()
            .ok()
            .map(|inner| inner.clone())
            .unwrap_or_default()
    }
}

impl Default for MetaStore {
    fn default() -> Self {
        Self::new()
    }
}
