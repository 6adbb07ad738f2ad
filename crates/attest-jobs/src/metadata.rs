//! Shared key-value metadata for one run.
//!
//! Cloned handles share the same map, so concurrent items inside a batch
//! can update counters while the orchestrator reads snapshots.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

pub const KEY_TOTAL: &str = "total";
pub const KEY_COMPLETED: &str = "completed";
pub const KEY_FAILED: &str = "failed";
pub const KEY_CURRENT_BATCH: &str = "current_batch";
pub const KEY_TOTAL_BATCHES: &str = "total_batches";

#[derive(Debug, Clone, Default)]
pub struct RunMetadata {
    inner: Arc<Mutex<Map<String, Value>>>,
}

impl RunMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer cannot leave a half-written JSON value behind,
    // so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.lock().insert(key.to_string(), value.into());
    }

    /// Add `by` to an integer key, treating a missing or non-integer value as 0.
    pub fn increment(&self, key: &str, by: i64) -> i64 {
        let mut map = self.lock();
        let next = map.get(key).and_then(Value::as_i64).unwrap_or(0) + by;
        map.insert(key.to_string(), Value::from(next));
        next
    }

    /// Push onto an array key, replacing a non-array value.
    pub fn append(&self, key: &str, value: impl Into<Value>) {
        let mut map = self.lock();
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            items.push(value.into());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.lock().get(key).and_then(Value::as_i64)
    }

    /// Point-in-time copy as a JSON object.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        Value::Object(self.lock().clone())
    }
}
