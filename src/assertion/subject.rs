//! The value under test

use serde_json::Value as JsonValue;
use std::fmt;

const DISPLAY_LIMIT: usize = 100;

/// A value handed to `expect(...)`
///
/// JSON cannot express `undefined`, so it gets its own variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Undefined,
    Value(JsonValue),
}

impl Subject {
    pub fn null() -> Self {
        Subject::Value(JsonValue::Null)
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Subject::Undefined => None,
            Subject::Value(v) => Some(v),
        }
    }

    /// JavaScript truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Subject::Undefined => false,
            Subject::Value(v) => match v {
                JsonValue::Null => false,
                JsonValue::Bool(b) => *b,
                JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
                JsonValue::String(s) => !s.is_empty(),
                JsonValue::Array(_) | JsonValue::Object(_) => true,
            },
        }
    }

    /// Type name as reported by the assertion messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Subject::Undefined => "undefined",
            Subject::Value(v) => match v {
                JsonValue::Null => "null",
                JsonValue::Bool(_) => "boolean",
                JsonValue::Number(_) => "number",
                JsonValue::String(_) => "string",
                JsonValue::Array(_) => "array",
                JsonValue::Object(_) => "object",
            },
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_json().and_then(JsonValue::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(JsonValue::as_str)
    }

    /// Deep equality; numbers compare by value so `1` equals `1.0`
    pub fn deep_equals(&self, other: &Subject) -> bool {
        match (self, other) {
            (Subject::Undefined, Subject::Undefined) => true,
            (Subject::Value(a), Subject::Value(b)) => json_equals(a, b),
            _ => false,
        }
    }
}

impl From<JsonValue> for Subject {
    fn from(value: JsonValue) -> Self {
        Subject::Value(value)
    }
}

impl From<&str> for Subject {
    fn from(value: &str) -> Self {
        Subject::Value(JsonValue::String(value.to_string()))
    }
}

impl From<Option<JsonValue>> for Subject {
    fn from(value: Option<JsonValue>) -> Self {
        value.map(Subject::Value).unwrap_or(Subject::Undefined)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Subject::Undefined => "undefined".to_string(),
            Subject::Value(v) => v.to_string(),
        };
        if text.chars().count() > DISPLAY_LIMIT {
            let cut: String = text.chars().take(DISPLAY_LIMIT).collect();
            write!(f, "{}...", cut)
        } else {
            f.write_str(&text)
        }
    }
}

pub(crate) fn json_equals(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equals(l, r))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_equals(v, w)))
        }
        _ => a == b,
    }
}
