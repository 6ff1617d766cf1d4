//! Request-scoped session handle
//!
//! The scope guards operate on whatever session the embedding deployment
//! attaches to the request (as an extension). A request without a session
//! skips all guard logic. `invalidate` destroys the whole session, not just
//! the tenancy keys.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

#[derive(Default)]
struct SessionInner {
    values: HashMap<String, Value>,
    invalidated: bool,
}

/// Cloneable handle to one session's state
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.values.get(key).cloned())
    }

    pub fn put(&self, key: &str, value: Value) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.values.insert(key.to_string(), value);
        }
    }

    pub fn forget(&self, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.values.remove(key);
        }
    }

    /// Destroy the session: drop all data and mark it invalidated.
    pub fn invalidate(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.values.clear();
            inner.invalidated = true;
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.invalidated)
            .unwrap_or(false)
    }
}
