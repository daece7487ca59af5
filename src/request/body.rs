//! Request body variants

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::KeyValue;

/// Content type hint for raw bodies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawBodyType {
    #[default]
    Text,
    Json,
    Xml,
    Html,
    Javascript,
}

/// Whether a multipart field carries text or a file reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormDataKind {
    #[default]
    Text,
    File,
}

/// A multipart form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDataItem {
    pub key: String,
    pub value: String,
    #[serde(default, rename = "type")]
    pub kind: FormDataKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RequestBody {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    Raw { raw_type: RawBodyType, content: String },
    FormData { items: Vec<FormDataItem> },
    #[serde(rename = "x-www-form-urlencoded")]
    UrlEncoded { params: Vec<KeyValue> },
    #[serde(rename = "graphql")]
    GraphQl { query: String, variables: String },
    Binary { path: Option<String> },
}

impl RequestBody {
    pub fn raw(raw_type: RawBodyType, content: &str) -> Self {
        RequestBody::Raw {
            raw_type,
            content: content.to_string(),
        }
    }

    pub fn json(value: &JsonValue) -> Self {
        RequestBody::Raw {
            raw_type: RawBodyType::Json,
            content: value.to_string(),
        }
    }

    /// Apply `f` to every resolvable text leaf. File fields and binary bodies are untouched.
    pub fn map_text(&self, f: &dyn Fn(&str) -> String) -> RequestBody {
        match self {
            RequestBody::None => RequestBody::None,
            RequestBody::Raw { raw_type, content } => RequestBody::Raw {
                raw_type: *raw_type,
                content: f(content),
            },
            RequestBody::FormData { items } => RequestBody::FormData {
                items: items
                    .iter()
                    .map(|item| match item.kind {
                        FormDataKind::Text => FormDataItem {
                            value: f(&item.value),
                            ..item.clone()
                        },
                        FormDataKind::File => item.clone(),
                    })
                    .collect(),
            },
            RequestBody::UrlEncoded { params } => RequestBody::UrlEncoded {
                params: params
                    .iter()
                    .map(|kv| KeyValue {
                        value: f(&kv.value),
                        ..kv.clone()
                    })
                    .collect(),
            },
            RequestBody::GraphQl { query, variables } => RequestBody::GraphQl {
                query: f(query),
                variables: f(variables),
            },
            RequestBody::Binary { path } => RequestBody::Binary { path: path.clone() },
        }
    }

    /// The value scripts see as `pm.request.body`
    pub fn to_script_value(&self) -> Option<JsonValue> {
        match self {
            RequestBody::None => None,
            RequestBody::Raw { content, .. } => Some(JsonValue::String(content.clone())),
            other => serde_json::to_value(other).ok(),
        }
    }

    /// Rebuild a body from the value a script left in `pm.request.body`
    pub fn from_script_value(value: Option<&JsonValue>, previous: &RequestBody) -> RequestBody {
        let value = match value {
            None | Some(JsonValue::Null) => return RequestBody::None,
            Some(v) => v,
        };

        if let JsonValue::String(content) = value {
            let raw_type = match previous {
                RequestBody::Raw { raw_type, .. } => *raw_type,
                _ => RawBodyType::Text,
            };
            return RequestBody::Raw {
                raw_type,
                content: content.clone(),
            };
        }

        if value.get("type").is_some() {
            if let Ok(body) = serde_json::from_value::<RequestBody>(value.clone()) {
                return body;
            }
        }

        RequestBody::json(value)
    }
}
