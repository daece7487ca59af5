//! Script context: the snapshot a script runs against
//!
//! Built fresh for every invocation from the variable store and the request
//! (plus the response for test scripts). The sandbox works on its own deep
//! copy, so nothing here aliases live state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::request::{Request, Response};
use crate::variables::{VariableScope, VariableStore};

/// Request view exposed as `pm.request`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub url: String,
    pub method: String,
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
}

impl ScriptRequest {
    pub fn from_request(request: &Request) -> Self {
        Self {
            url: request.url.clone(),
            method: request.method.clone(),
            headers: request.enabled_headers(),
            body: request.body.to_script_value(),
        }
    }

    /// Header value, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace any header with the same name (case-insensitive) or append
    pub fn upsert_header(&mut self, name: &str, value: &str) {
        match self.headers.keys().position(|k| k.eq_ignore_ascii_case(name)) {
            Some(index) => {
                self.headers.shift_remove_index(index);
                self.headers.shift_insert(index, name.to_string(), value.to_string());
            }
            None => {
                self.headers.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn remove_header(&mut self, name: &str) -> bool {
        let before = self.headers.len();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.len() != before
    }
}

/// Response view exposed as `pm.response`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: JsonValue,
    #[serde(default)]
    pub response_time_ms: u64,
}

impl ScriptResponse {
    pub fn from_response(response: &Response) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            response_time_ms: response.duration_ms,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text: strings verbatim, null as empty, anything else as JSON
    pub fn text(&self) -> String {
        match &self.body {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Body as JSON: string bodies are parsed, `None` when that fails
    pub fn json(&self) -> Option<JsonValue> {
        match &self.body {
            JsonValue::String(s) => serde_json::from_str(s).ok(),
            JsonValue::Null => None,
            other => Some(other.clone()),
        }
    }

    /// Coarse status label reported by `pm.response.status()`
    pub fn status_label(&self) -> &'static str {
        match self.status {
            200..=299 => "OK",
            300..=399 => "Redirect",
            400..=499 => "Client Error",
            500.. => "Server Error",
            _ => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptContext {
    pub environment: IndexMap<String, JsonValue>,
    pub globals: IndexMap<String, JsonValue>,
    #[serde(default)]
    pub locals: IndexMap<String, JsonValue>,
    pub request: ScriptRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ScriptResponse>,
}

impl ScriptContext {
    /// Snapshot the enabled variables of every scope and the (unresolved) request
    ///
    /// With no active environment, environment writes land in the local
    /// scope, so `environment` shows the locals to keep them readable.
    pub fn from_store(store: &VariableStore, request: &Request) -> Self {
        let environment = match store.active_environment() {
            Some(_) => scope_values(store, VariableScope::Environment),
            None => scope_values(store, VariableScope::Local),
        };
        Self {
            environment,
            globals: scope_values(store, VariableScope::Global),
            locals: scope_values(store, VariableScope::Local),
            request: ScriptRequest::from_request(request),
            response: None,
        }
    }

    pub fn with_response(mut self, response: &Response) -> Self {
        self.response = Some(ScriptResponse::from_response(response));
        self
    }
}

fn scope_values(store: &VariableStore, scope: VariableScope) -> IndexMap<String, JsonValue> {
    store
        .enabled_map(scope)
        .into_iter()
        .map(|(k, v)| (k, JsonValue::String(v)))
        .collect()
}
