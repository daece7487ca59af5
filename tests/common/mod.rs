//! Common test utilities for pulsescript integration tests
//!
//! - Variable store fixtures
//! - Transports: a recording mock, a failing one, and a reqwest client for wiremock servers

#![allow(dead_code)]

use std::sync::Mutex;

use pulsescript::errors::{PulseScriptError, Result};
use pulsescript::{Request, Response, Transport, VariableScope, VariableStore};
use serde_json::Value as JsonValue;

/// A store with one active environment holding `vars`
pub fn store_with_env(vars: &[(&str, &str)]) -> VariableStore {
    let mut store = VariableStore::new();
    let env = store.create_environment("test");
    store.set_active_environment(Some(&env));
    for (key, value) in vars {
        store.set(VariableScope::Environment, key, value);
    }
    store
}

/// Records every request and answers with a fixed response
pub struct MockTransport {
    response: Response,
    sent: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn ok_json(body: JsonValue) -> Self {
        Self::new(Response::new(200, body).with_header("Content-Type", "application/json"))
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<Response> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

pub struct FailingTransport;

impl Transport for FailingTransport {
    async fn send(&self, _request: &Request) -> Result<Response> {
        Err(PulseScriptError::Transport("connection refused".to_string()))
    }
}

/// Plain HTTP over reqwest, for tests against a wiremock server
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Response> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| PulseScriptError::Transport(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (key, value) in request.enabled_headers() {
            builder = builder.header(key, value);
        }
        if let Some(JsonValue::String(raw)) = request.body.to_script_value() {
            builder = builder.body(raw);
        }

        let started = std::time::Instant::now();
        let resp = builder
            .send()
            .await
            .map_err(|e| PulseScriptError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let text = resp
            .text()
            .await
            .map_err(|e| PulseScriptError::Transport(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(JsonValue::String(text.clone()));

        let mut response = Response::new(status, body).with_duration(started.elapsed().as_millis() as u64);
        response.headers = headers;
        response.size = text.len();
        Ok(response)
    }
}
