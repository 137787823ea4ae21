use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A shared, free-form key/value record attached to the final exit report.
///
/// Any part of the running process may populate the context through a clone
/// of this handle. The shutdown coordinator reads it exactly once, while
/// reporting the exit, and never clears it.
///
/// ## Example
///
/// ```
/// use curtain_core::DiagnosticContext;
///
/// let context = DiagnosticContext::new();
/// context.insert("foo", "bar").unwrap();
///
/// assert_eq!(context.to_json(), r#"{"foo":"bar"}"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiagnosticContext {
    entries: Arc<Mutex<Map<String, Value>>>,
}

impl DiagnosticContext {
    /// Creates a new, empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the given value and stores it under the given key,
    /// returning the previously stored value, if any.
    pub fn insert(
        &self,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Option<Value>, serde_json::Error> {
        let value = serde_json::to_value(value)?;

        Ok(self.entries.lock().insert(key.into(), value))
    }

    /// Removes the value stored under the given key.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.lock().remove(key)
    }

    /// Returns a copy of the value stored under the given key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Reports whether nothing was stored in this context.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Reports the number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Serializes the whole context into compact JSON.
    pub fn to_json(&self) -> String {
        let entries = self.entries.lock();

        // A map of JSON values always serializes
        serde_json::to_string(&*entries).unwrap_or_else(|_| String::from("{}"))
    }
}
