//! Request and response models consumed by the engine
//!
//! These mirror what the request builder and transport collaborators hand
//! over: an editable request with enable flags on every pair, and a decoded
//! response.

pub mod body;
pub mod response;

pub use body::{FormDataItem, FormDataKind, RawBodyType, RequestBody};
pub use response::Response;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A header, query parameter or urlencoded field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl KeyValue {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            enabled: true,
            description: None,
        }
    }
}

/// Authentication settings; every config value is resolvable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: IndexMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            kind: "noauth".to_string(),
            config: IndexMap::new(),
        }
    }
}

/// A user script stored alongside a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSource {
    pub enabled: bool,
    pub content: String,
}

impl ScriptSource {
    pub fn new(content: &str) -> Self {
        Self {
            enabled: true,
            content: content.to_string(),
        }
    }

    /// Enabled and not blank
    pub fn is_runnable(&self) -> bool {
        self.enabled && !self.content.trim().is_empty()
    }
}

/// An editable HTTP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub params: Vec<KeyValue>,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub pre_request_script: ScriptSource,
    #[serde(default)]
    pub test_script: ScriptSource,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            method: method.to_uppercase(),
            url: url.to_string(),
            params: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::None,
            auth: AuthConfig::default(),
            pre_request_script: ScriptSource::default(),
            test_script: ScriptSource::default(),
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push(KeyValue::new(key, value));
        self
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push(KeyValue::new(key, value));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_pre_request_script(mut self, content: &str) -> Self {
        self.pre_request_script = ScriptSource::new(content);
        self
    }

    pub fn with_test_script(mut self, content: &str) -> Self {
        self.test_script = ScriptSource::new(content);
        self
    }

    /// Value of an enabled header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.enabled && h.key.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Update the first enabled header with this name or append a new one.
    /// Returns whether anything changed.
    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        match self
            .headers
            .iter_mut()
            .find(|h| h.enabled && h.key.eq_ignore_ascii_case(name))
        {
            Some(h) if h.value == value => false,
            Some(h) => {
                h.value = value.to_string();
                true
            }
            None => {
                self.headers.push(KeyValue::new(name, value));
                true
            }
        }
    }

    /// Disable every enabled header with this name
    pub fn disable_header(&mut self, name: &str) -> bool {
        let mut changed = false;
        for h in self
            .headers
            .iter_mut()
            .filter(|h| h.enabled && h.key.eq_ignore_ascii_case(name))
        {
            h.enabled = false;
            changed = true;
        }
        changed
    }

    /// Enabled headers as an ordered map (later duplicates overwrite earlier ones)
    pub fn enabled_headers(&self) -> IndexMap<String, String> {
        self.headers
            .iter()
            .filter(|h| h.enabled)
            .map(|h| (h.key.clone(), h.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::new("get", "https://api.example.com").with_header("Content-Type", "application/json");
        assert_eq!(req.method, "GET");
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_set_header_updates_in_place() {
        let mut req = Request::new("GET", "/").with_header("X-Token", "a");
        assert!(req.set_header("x-token", "b"));
        assert!(!req.set_header("X-Token", "b"));
        assert_eq!(req.headers.len(), 1);
        assert!(req.set_header("Accept", "*/*"));
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn test_disabled_headers_hidden() {
        let mut req = Request::new("GET", "/").with_header("A", "1");
        assert!(req.disable_header("a"));
        assert!(req.enabled_headers().is_empty());
        assert_eq!(req.header("A"), None);
    }

    #[test]
    fn test_script_source_runnable() {
        assert!(!ScriptSource::default().is_runnable());
        assert!(!ScriptSource::new("   \n").is_runnable());
        assert!(ScriptSource::new("pm.info('x')").is_runnable());
    }
}
