//! `{{name}}` placeholder resolution
//!
//! Placeholders are resolved against a scope chain snapshot. Dynamic tokens
//! (see [`super::dynamic`]) win over scope lookups and regenerate on every
//! occurrence. Unknown placeholders stay verbatim in the output.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::cell::Cell;

use super::dynamic;
use super::store::ScopeChain;
use crate::config::ResolverConfig;
use crate::request::{AuthConfig, KeyValue, Request, RequestBody};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder pattern is valid"));

/// Anything that can answer "what is the value of this variable"
pub trait VariableLookup {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>>;
}

impl VariableLookup for ScopeChain<'_> {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(Cow::Borrowed)
    }
}

impl VariableLookup for IndexMap<String, String> {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl<T: VariableLookup + ?Sized> VariableLookup for &T {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        (**self).lookup(key)
    }
}

/// Placeholder resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    max_depth: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self { max_depth: 1 }
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow resolved values to be re-scanned up to `max_depth` passes in total
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::with_max_depth(config.max_depth)
    }

    /// Substitute every `{{name}}` in `text`
    pub fn resolve(&self, text: &str, scopes: &impl VariableLookup) -> String {
        let mut current = text.to_string();
        for _ in 0..self.max_depth {
            let (next, replaced) = resolve_pass(&current, scopes);
            current = next;
            if !replaced {
                break;
            }
        }
        current
    }

    /// Resolve every value-bearing field of a request; keys and binary payloads are left alone
    pub fn resolve_request(&self, request: &Request, scopes: &impl VariableLookup) -> Request {
        let text = |s: &str| self.resolve(s, scopes);
        let pairs = |items: &[KeyValue]| -> Vec<KeyValue> {
            items
                .iter()
                .map(|kv| KeyValue {
                    value: text(&kv.value),
                    ..kv.clone()
                })
                .collect()
        };

        let mut resolved = request.clone();
        resolved.url = text(&request.url);
        resolved.headers = pairs(&request.headers);
        resolved.params = pairs(&request.params);
        resolved.body = request.body.map_text(&text);
        resolved.auth = AuthConfig {
            kind: request.auth.kind.clone(),
            config: request
                .auth
                .config
                .iter()
                .map(|(k, v)| (k.clone(), text(v)))
                .collect(),
        };
        resolved
    }

    pub fn resolve_body(&self, body: &RequestBody, scopes: &impl VariableLookup) -> RequestBody {
        body.map_text(&|s| self.resolve(s, scopes))
    }
}

/// One substitution pass; reports whether anything was replaced
fn resolve_pass(text: &str, scopes: &impl VariableLookup) -> (String, bool) {
    let replaced = Cell::new(false);
    let out = PLACEHOLDER_RE.replace_all(text, |caps: &Captures| {
        let name = caps[1].trim();
        let value = dynamic::generate(name).or_else(|| scopes.lookup(name).map(|v| stored_value(&v)));
        match value {
            Some(v) => {
                replaced.set(true);
                v
            }
            None => caps[0].to_string(),
        }
    });
    (out.into_owned(), replaced.get())
}

/// A stored value that is exactly a dynamic token, such as `{{$guid}}`,
/// regenerates on every lookup
fn stored_value(value: &str) -> String {
    value
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .and_then(|name| dynamic::generate(name.trim()))
        .unwrap_or_else(|| value.to_string())
}

/// Resolve with the default (single pass) resolver
pub fn resolve(text: &str, scopes: &impl VariableLookup) -> String {
    Resolver::default().resolve(text, scopes)
}

/// Names of all placeholders in `text`, trimmed, in order of appearance
pub fn placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Placeholders in `text` that neither the catalogue nor the scopes can answer
pub fn unresolved(text: &str, scopes: &impl VariableLookup) -> Vec<String> {
    placeholders(text)
        .into_iter()
        .filter(|name| !dynamic::is_dynamic(name) && scopes.lookup(name).is_none())
        .collect()
}
