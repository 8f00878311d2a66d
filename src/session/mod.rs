//! Session store module
//!
//! One session per client identity (the peer IP address), created lazily on
//! the first request and kept for the lifetime of the process. There is no
//! eviction: the store only grows.

mod value;

pub use value::Value;

use std::collections::HashMap;

/// Per-client key/value bag
#[derive(Debug, Clone)]
pub struct Session {
    identity: String,
    values: HashMap<String, Value>,
}

impl Session {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            values: HashMap::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Look up a key, yielding `Value::Null` when it was never set
    pub fn get(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Truthiness of a stored flag; a missing key is false
    pub fn is_truthy(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(Value::is_truthy)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Identity → session map
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `identity`, creating it on first use
    pub fn get_or_create(&mut self, identity: &str) -> &mut Session {
        self.sessions
            .entry(identity.to_string())
            .or_insert_with(|| Session::new(identity))
    }

    pub fn get(&self, identity: &str) -> Option<&Session> {
        self.sessions.get(identity)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_null() {
        let session = Session::new("10.0.0.1");
        assert_eq!(session.get("nope"), Value::Null);
        assert!(!session.is_truthy("nope"));
    }

    #[test]
    fn test_values_keep_native_type() {
        let mut session = Session::new("10.0.0.1");
        session.set("count", 3);
        session.set("name", "ada");
        session.set("flag", true);
        assert_eq!(session.get("count"), Value::Int(3));
        assert_eq!(session.get("name"), Value::Str("ada".to_string()));
        assert_eq!(session.get("flag"), Value::Bool(true));
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = SessionStore::new();
        store.get_or_create("10.0.0.1").set("k", 1);
        assert_eq!(store.get_or_create("10.0.0.1").get("k"), Value::Int(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_identities_are_isolated() {
        let mut store = SessionStore::new();
        store.get_or_create("10.0.0.1").set("secret", "a");
        let other = store.get_or_create("10.0.0.2");
        assert_eq!(other.get("secret"), Value::Null);
        assert_eq!(other.identity(), "10.0.0.2");
        assert_eq!(store.len(), 2);
    }
}
