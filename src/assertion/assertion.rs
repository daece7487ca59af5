//! Assertion kinds and how each is evaluated

use regex::RegexBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::subject::{json_equals, Subject};

/// A failed or malformed assertion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AssertionError {
    pub message: String,
}

impl AssertionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<AssertionError> for crate::errors::PulseScriptError {
    fn from(err: AssertionError) -> Self {
        crate::errors::PulseScriptError::Assertion(err.message)
    }
}

/// One check the fluent chain can end in
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Ok,
    True,
    False,
    Null,
    Undefined,
    Empty,
    Type(String),
    Eql(Subject),
    Above(f64),
    Below(f64),
    Include(Subject),
    Contain(Subject),
    Property(String),
    PropertyValue(String, Subject),
    Keys(Vec<String>),
    Length(usize),
    Match { source: String, flags: String },
    /// A pattern already tested by the script engine
    Matched { pattern: String, matched: bool },
    Status(u16),
    Success,
    Redirect,
    ClientError,
    ServerError,
    Header(String),
    HeaderValue(String, String),
}

/// Raw outcome before negation is applied
pub(crate) struct Verdict {
    pub holds: bool,
    pub actual: Option<String>,
}

impl Verdict {
    fn of(holds: bool) -> Self {
        Self { holds, actual: None }
    }

    fn with_actual(holds: bool, actual: impl ToString) -> Self {
        Self {
            holds,
            actual: Some(actual.to_string()),
        }
    }
}

impl Assertion {
    /// Build an assertion from the operation name used by the script bridge
    pub fn from_op(op: &str, expected: Subject, extra: Subject) -> Result<Self, AssertionError> {
        let assertion = match op {
            "ok" => Assertion::Ok,
            "true" => Assertion::True,
            "false" => Assertion::False,
            "null" => Assertion::Null,
            "undefined" => Assertion::Undefined,
            "empty" => Assertion::Empty,
            "success" => Assertion::Success,
            "redirect" => Assertion::Redirect,
            "clientError" => Assertion::ClientError,
            "serverError" => Assertion::ServerError,
            "a" => Assertion::Type(required_str(op, &expected)?.to_lowercase()),
            "eql" => Assertion::Eql(expected),
            "above" => Assertion::Above(required_number(op, &expected)?),
            "below" => Assertion::Below(required_number(op, &expected)?),
            "include" => Assertion::Include(expected),
            "contain" => Assertion::Contain(expected),
            "property" => Assertion::Property(required_str(op, &expected)?.to_string()),
            "propertyValue" => {
                Assertion::PropertyValue(required_str(op, &expected)?.to_string(), extra)
            }
            "keys" => Assertion::Keys(key_list(&expected)?),
            "length" => {
                let n = required_number(op, &expected)?;
                if n < 0.0 || n.fract() != 0.0 {
                    return Err(AssertionError::new(format!(
                        "length expects a non-negative integer, got {}",
                        expected
                    )));
                }
                Assertion::Length(n as usize)
            }
            "match" => match expected.as_json() {
                Some(JsonValue::String(source)) => Assertion::Match {
                    source: source.clone(),
                    flags: String::new(),
                },
                Some(JsonValue::Object(obj)) => Assertion::Match {
                    source: obj.get("source").and_then(JsonValue::as_str).unwrap_or_default().to_string(),
                    flags: obj.get("flags").and_then(JsonValue::as_str).unwrap_or_default().to_string(),
                },
                _ => {
                    return Err(AssertionError::new(format!(
                        "match expects a RegExp or string, got {}",
                        expected
                    )))
                }
            },
            "matched" => Assertion::Matched {
                pattern: required_str(op, &expected)?.to_string(),
                matched: extra.as_json().and_then(JsonValue::as_bool).unwrap_or(false),
            },
            "status" => {
                let code = required_number(op, &expected)?;
                Assertion::Status(status_code(code).ok_or_else(|| {
                    AssertionError::new(format!("status expects an HTTP status code, got {}", expected))
                })?)
            }
            "header" => Assertion::Header(required_str(op, &expected)?.to_string()),
            "headerValue" => {
                let name = required_str(op, &expected)?.to_string();
                let value = match extra {
                    Subject::Value(JsonValue::String(s)) => s,
                    Subject::Value(other) => other.to_string(),
                    Subject::Undefined => String::new(),
                };
                Assertion::HeaderValue(name, value)
            }
            other => return Err(AssertionError::new(format!("Unknown assertion '{}'", other))),
        };
        Ok(assertion)
    }

    /// Phrase completing "expected X to ..."
    pub fn describe(&self) -> String {
        match self {
            Assertion::Ok => "be ok".into(),
            Assertion::True => "be true".into(),
            Assertion::False => "be false".into(),
            Assertion::Null => "be null".into(),
            Assertion::Undefined => "be undefined".into(),
            Assertion::Empty => "be empty".into(),
            Assertion::Type(t) => {
                let article = if t.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
                format!("be {} {}", article, t)
            }
            Assertion::Eql(v) => format!("deeply equal {}", v),
            Assertion::Above(n) => format!("be above {}", format_number(*n)),
            Assertion::Below(n) => format!("be below {}", format_number(*n)),
            Assertion::Include(v) => format!("include {}", v),
            Assertion::Contain(v) => format!("contain {}", v),
            Assertion::Property(name) => format!("have property '{}'", name),
            Assertion::PropertyValue(name, v) => format!("have property '{}' of {}", name, v),
            Assertion::Keys(keys) => {
                let list: Vec<String> = keys.iter().map(|k| format!("'{}'", k)).collect();
                format!("have keys {}", list.join(", "))
            }
            Assertion::Length(n) => format!("have length {}", n),
            Assertion::Match { source, flags } => format!("match /{}/{}", source, flags),
            Assertion::Matched { pattern, .. } => format!("match {}", pattern),
            Assertion::Status(code) => format!("have status code {}", code),
            Assertion::Success => "have a success status (2xx)".into(),
            Assertion::Redirect => "have a redirect status (3xx)".into(),
            Assertion::ClientError => "have a client error status (4xx)".into(),
            Assertion::ServerError => "have a server error status (5xx)".into(),
            Assertion::Header(name) => format!("have header '{}'", name),
            Assertion::HeaderValue(name, value) => {
                format!("have header '{}' with value '{}'", name, value)
            }
        }
    }

    /// Evaluate against `subject`; `Err` means the subject has the wrong shape
    /// for this assertion, which fails whether or not the chain is negated.
    pub(crate) fn evaluate(&self, subject: &Subject) -> Result<Verdict, AssertionError> {
        let verdict = match self {
            Assertion::Ok => Verdict::of(subject.is_truthy()),
            Assertion::True => Verdict::of(subject.as_json() == Some(&JsonValue::Bool(true))),
            Assertion::False => Verdict::of(subject.as_json() == Some(&JsonValue::Bool(false))),
            Assertion::Null => Verdict::of(subject.as_json() == Some(&JsonValue::Null)),
            Assertion::Undefined => Verdict::of(*subject == Subject::Undefined),
            Assertion::Empty => match subject.as_json() {
                Some(JsonValue::String(s)) => Verdict::of(s.is_empty()),
                Some(JsonValue::Array(a)) => Verdict::of(a.is_empty()),
                Some(JsonValue::Object(o)) => Verdict::of(o.is_empty()),
                _ => return Err(wrong_type(subject, "be empty", "a string, array or object")),
            },
            Assertion::Type(t) => Verdict::with_actual(subject.type_name() == t, subject.type_name()),
            Assertion::Eql(expected) => Verdict::of(subject.deep_equals(expected)),
            Assertion::Above(n) => {
                let actual = numeric(subject, &self.describe())?;
                Verdict::of(actual > *n)
            }
            Assertion::Below(n) => {
                let actual = numeric(subject, &self.describe())?;
                Verdict::of(actual < *n)
            }
            Assertion::Include(expected) | Assertion::Contain(expected) => {
                Verdict::of(includes(subject, expected, &self.describe())?)
            }
            Assertion::Property(name) => Verdict::of(property(subject, name, &self.describe())?.is_some()),
            Assertion::PropertyValue(name, expected) => {
                match property(subject, name, &self.describe())? {
                    Some(actual) => Verdict::with_actual(actual.deep_equals(expected), actual),
                    None => Verdict::of(false),
                }
            }
            Assertion::Keys(keys) => match subject.as_json() {
                Some(JsonValue::Object(obj)) => {
                    // extra keys on the object are allowed
                    let holds = keys.iter().all(|k| obj.contains_key(k));
                    let actual: Vec<&str> = obj.keys().map(String::as_str).collect();
                    Verdict::with_actual(holds, format!("[{}]", actual.join(", ")))
                }
                _ => return Err(wrong_type(subject, &self.describe(), "an object")),
            },
            Assertion::Length(n) => {
                let actual = match subject.as_json() {
                    Some(JsonValue::String(s)) => s.encode_utf16().count(),
                    Some(JsonValue::Array(a)) => a.len(),
                    _ => return Err(wrong_type(subject, &self.describe(), "a string or array")),
                };
                Verdict::with_actual(actual == *n, actual)
            }
            Assertion::Match { source, flags } => {
                let text = subject
                    .as_str()
                    .ok_or_else(|| wrong_type(subject, &self.describe(), "a string"))?;
                let re = RegexBuilder::new(source)
                    .case_insensitive(flags.contains('i'))
                    .multi_line(flags.contains('m'))
                    .dot_matches_new_line(flags.contains('s'))
                    .build()
                    .map_err(|e| AssertionError::new(format!("Invalid pattern /{}/: {}", source, e)))?;
                Verdict::of(re.is_match(text))
            }
            Assertion::Matched { matched, .. } => {
                subject
                    .as_str()
                    .ok_or_else(|| wrong_type(subject, &self.describe(), "a string"))?;
                Verdict::of(*matched)
            }
            Assertion::Status(code) => {
                let actual = status_of(subject, &self.describe())?;
                Verdict::with_actual(actual == *code, actual)
            }
            Assertion::Success => status_class(subject, 200, &self.describe())?,
            Assertion::Redirect => status_class(subject, 300, &self.describe())?,
            Assertion::ClientError => status_class(subject, 400, &self.describe())?,
            Assertion::ServerError => status_class(subject, 500, &self.describe())?,
            Assertion::Header(name) => Verdict::of(header(subject, name, &self.describe())?.is_some()),
            Assertion::HeaderValue(name, value) => match header(subject, name, &self.describe())? {
                Some(actual) => Verdict::with_actual(actual == *value, format!("'{}'", actual)),
                None => Verdict::of(false),
            },
        };
        Ok(verdict)
    }
}

fn required_str<'a>(op: &str, value: &'a Subject) -> Result<&'a str, AssertionError> {
    value
        .as_str()
        .ok_or_else(|| AssertionError::new(format!("{} expects a string argument, got {}", op, value)))
}

fn required_number(op: &str, value: &Subject) -> Result<f64, AssertionError> {
    value
        .as_f64()
        .ok_or_else(|| AssertionError::new(format!("{} expects a number argument, got {}", op, value)))
}

fn key_list(value: &Subject) -> Result<Vec<String>, AssertionError> {
    match value.as_json() {
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) => Ok(s.clone()),
                other => Err(AssertionError::new(format!("keys expects strings, got {}", other))),
            })
            .collect(),
        Some(JsonValue::String(s)) => Ok(vec![s.clone()]),
        _ => Err(AssertionError::new(format!("keys expects a list of strings, got {}", value))),
    }
}

fn status_code(n: f64) -> Option<u16> {
    if n.fract() == 0.0 && (100.0..=999.0).contains(&n) {
        Some(n as u16)
    } else {
        None
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn wrong_type(subject: &Subject, what: &str, needed: &str) -> AssertionError {
    AssertionError::new(format!(
        "expected {} to {}, but {} is not {}",
        subject,
        what,
        subject.type_name(),
        needed
    ))
}

fn numeric(subject: &Subject, what: &str) -> Result<f64, AssertionError> {
    subject.as_f64().ok_or_else(|| wrong_type(subject, what, "a number"))
}

fn includes(subject: &Subject, expected: &Subject, what: &str) -> Result<bool, AssertionError> {
    match (subject.as_json(), expected) {
        (Some(JsonValue::String(s)), needle) => Ok(s.contains(js_string(needle).as_str())),
        (Some(JsonValue::Array(items)), Subject::Value(needle)) => {
            Ok(items.iter().any(|item| json_equals(item, needle)))
        }
        (Some(JsonValue::Array(_)), Subject::Undefined) => Ok(false),
        (Some(JsonValue::Object(obj)), Subject::Value(JsonValue::Object(subset))) => Ok(subset
            .iter()
            .all(|(k, v)| obj.get(k).is_some_and(|actual| json_equals(actual, v)))),
        (Some(JsonValue::Object(_)), _) => Err(AssertionError::new(format!(
            "expected {} to {}, but only an object can be matched against an object",
            subject, what
        ))),
        _ => Err(wrong_type(subject, what, "a string, array or object")),
    }
}

/// `String(value)` as JavaScript would render it
fn js_string(value: &Subject) -> String {
    match value {
        Subject::Undefined => "undefined".to_string(),
        Subject::Value(v) => json_string(v),
    }
}

fn json_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::Null => String::new(),
                other => json_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        JsonValue::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

fn property(subject: &Subject, name: &str, what: &str) -> Result<Option<Subject>, AssertionError> {
    match subject.as_json() {
        Some(JsonValue::Object(obj)) => Ok(obj.get(name).cloned().map(Subject::Value)),
        Some(JsonValue::Array(items)) => {
            if name == "length" {
                return Ok(Some(Subject::Value(JsonValue::from(items.len()))));
            }
            Ok(name
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .map(Subject::Value))
        }
        Some(JsonValue::String(s)) if name == "length" => {
            Ok(Some(Subject::Value(JsonValue::from(s.encode_utf16().count()))))
        }
        Some(JsonValue::Null) | None => Err(wrong_type(subject, what, "an object")),
        Some(_) => Ok(None),
    }
}

fn status_of(subject: &Subject, what: &str) -> Result<u16, AssertionError> {
    let found = match subject.as_json() {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::Object(obj)) => obj
            .get("code")
            .or_else(|| obj.get("status"))
            .and_then(JsonValue::as_f64),
        _ => None,
    };
    found
        .and_then(status_code)
        .ok_or_else(|| wrong_type(subject, what, "a status code or response"))
}

fn status_class(subject: &Subject, base: u16, what: &str) -> Result<Verdict, AssertionError> {
    let code = status_of(subject, what)?;
    Ok(Verdict::with_actual((base..base + 100).contains(&code), code))
}

fn header(subject: &Subject, name: &str, what: &str) -> Result<Option<String>, AssertionError> {
    match subject.as_json() {
        Some(JsonValue::Object(obj)) => Ok(obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })),
        _ => Err(wrong_type(subject, what, "a header map")),
    }
}
