//! Request parameter mapping and its wire encoding.
//!
//! # Design
//! `Parameters` is an owned JSON object. Every preprocessing step the client
//! applies (defaults, token, forced flags, stringified fields, dropping
//! `method`) works on a copy the client owns, so a caller's mapping is never
//! changed behind its back.
//!
//! Values are flattened to strings for the wire: scalars as their text,
//! arrays as one pair per element, nested objects as JSON text, `null` as the
//! empty string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::http::HttpMethod;

/// A mapping of request parameter names to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Replace each named field that is present and not already a string
    /// with its JSON text. Absent fields are left alone.
    pub fn ensure_stringified(&mut self, fields: &[&str]) {
        for field in fields {
            if let Some(value) = self.0.get_mut(*field) {
                if !value.is_string() {
                    *value = Value::String(value.to_string());
                }
            }
        }
    }

    /// Fill `f` and `outFields` when missing or empty, and fall back to
    /// `token` when the mapping carries no token of its own.
    pub(crate) fn fill_defaults(&mut self, format: &str, token: Option<&str>) {
        if !self.is_set("f") {
            self.insert("f", format);
        }
        if !self.is_set("outFields") {
            self.insert("outFields", "*");
        }
        if !self.is_set("token") {
            if let Some(token) = token.filter(|t| !t.is_empty()) {
                self.insert("token", token);
            }
        }
    }

    /// Remove the `method` key and interpret it. A missing, empty or
    /// non-string method means GET.
    pub(crate) fn take_method(&mut self) -> HttpMethod {
        match self.0.remove("method") {
            Some(Value::String(name)) if !name.is_empty() => HttpMethod::from_name(&name),
            _ => HttpMethod::Get,
        }
    }

    /// Flatten to `(name, value)` string pairs in key order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            match value {
                Value::Array(items) => {
                    for item in items {
                        pairs.push((key.clone(), wire_text(item)));
                    }
                }
                other => pairs.push((key.clone(), wire_text(other))),
            }
        }
        pairs
    }

    /// `application/x-www-form-urlencoded` encoding, used both for GET query
    /// strings and POST bodies.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }

    fn is_set(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// JavaScript-style truthiness, used where a parameter's presence is decided
/// by value rather than by key.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn wire_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
