//! Decoded HTTP response handed over by the transport

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Parsed JSON when the payload was JSON, otherwise a string
    #[serde(default)]
    pub body: JsonValue,
    /// Round-trip time in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub size: usize,
}

impl Response {
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: IndexMap::new(),
            body,
            duration_ms: 0,
            size: 0,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text: strings verbatim, everything else as compact JSON
    pub fn body_text(&self) -> String {
        match &self.body {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}
