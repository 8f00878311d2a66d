//! Urlencoded input decoding
//!
//! Query strings and `application/x-www-form-urlencoded` bodies decode into
//! the same ordered map. An empty decoded value is stored as `None`.

/// Decoded request input, in first-seen key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, Option<String>)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `key=value&key=value` input
    ///
    /// Each pair is split on its first `=`; keys and values are
    /// percent-decoded with `+` read as a space. A repeated key replaces the
    /// earlier value but keeps its position.
    pub fn parse(input: &str) -> Self {
        // Invalid UTF-8 is replaced, not rejected
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(input).unwrap_or_default();

        let mut form = Self::new();
        for (key, value) in pairs {
            form.insert(key, Some(value).filter(|v| !v.is_empty()));
        }
        form
    }

    pub fn insert(&mut self, key: String, value: Option<String>) {
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    /// Value of `key`; `None` when missing or empty
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
