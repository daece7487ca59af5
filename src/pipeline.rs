//! Request send flow
//!
//! pre-request script → merge → resolve → send → test script → merge
//!
//! Script failures are reported on the outcome and never stop the request.
//! Only the transport can fail the pipeline.

use std::future::Future;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::merge::{merge_pre_request, merge_test, MergeReport};
use crate::request::{Request, Response};
use crate::scripting::{ScriptContext, ScriptKind, ScriptResult, ScriptSandbox};
use crate::variables::{Resolver, VariableStore};

/// Whatever actually puts a request on the wire
pub trait Transport {
    fn send(&self, request: &Request) -> impl Future<Output = Result<Response>>;
}

/// Everything one pass through the pipeline produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The resolved request as it was sent
    pub request: Request,
    pub response: Response,
    pub pre_request: Option<ScriptResult>,
    pub test: Option<ScriptResult>,
    pub pre_request_merge: MergeReport,
    pub test_merge: MergeReport,
}

impl PipelineOutcome {
    /// No script failed and no test block failed
    pub fn all_passed(&self) -> bool {
        [&self.pre_request, &self.test]
            .into_iter()
            .flatten()
            .all(ScriptResult::all_passed)
    }
}

pub struct RequestPipeline {
    sandbox: ScriptSandbox,
    resolver: Resolver,
}

impl RequestPipeline {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            sandbox: ScriptSandbox::new(&config.sandbox)?,
            resolver: Resolver::from_config(&config.resolver),
        })
    }

    pub fn sandbox(&self) -> &ScriptSandbox {
        &self.sandbox
    }

    /// Run the pre-request script, if any, and merge its changes into `request` and `store`
    pub fn run_pre_request(&self, request: &mut Request, store: &mut VariableStore) -> Option<ScriptResult> {
        self.run_pre_request_merged(request, store).map(|(result, _)| result)
    }

    fn run_pre_request_merged(
        &self,
        request: &mut Request,
        store: &mut VariableStore,
    ) -> Option<(ScriptResult, MergeReport)> {
        if !request.pre_request_script.is_runnable() {
            return None;
        }

        let snapshot = ScriptContext::from_store(store, request);
        let source = request.pre_request_script.content.clone();
        let result = self.sandbox.execute(ScriptKind::PreRequest, &source, &snapshot);
        if !result.success {
            warn!(
                request = %request.name,
                error = result.error.as_deref().unwrap_or_default(),
                "pre-request script failed, sending anyway"
            );
        }

        let report = merge_pre_request(store, request, &snapshot, &result);
        Some((result, report))
    }

    /// Substitute placeholders against the current scopes
    pub fn resolve_request(&self, request: &Request, store: &VariableStore) -> Request {
        self.resolver.resolve_request(request, &store.scope_chain())
    }

    /// Run the test script, if any, against the sent request and its response.
    /// Only variable changes are merged.
    pub fn run_tests(&self, request: &Request, response: &Response, store: &mut VariableStore) -> Option<ScriptResult> {
        self.run_tests_merged(request, response, store).map(|(result, _)| result)
    }

    fn run_tests_merged(
        &self,
        request: &Request,
        response: &Response,
        store: &mut VariableStore,
    ) -> Option<(ScriptResult, MergeReport)> {
        if !request.test_script.is_runnable() {
            return None;
        }

        let snapshot = ScriptContext::from_store(store, request).with_response(response);
        let result = self.sandbox.execute(ScriptKind::Test, &request.test_script.content, &snapshot);
        if !result.success {
            warn!(
                request = %request.name,
                error = result.error.as_deref().unwrap_or_default(),
                "test script failed"
            );
        }

        let report = merge_test(store, &snapshot, &result);
        Some((result, report))
    }

    /// Run the whole flow for one request
    ///
    /// `request` itself is left untouched; script edits apply to the copy that
    /// is sent. The local scope is cleared once the flow is done.
    pub async fn execute<T: Transport>(
        &self,
        request: &Request,
        store: &mut VariableStore,
        transport: &T,
    ) -> Result<PipelineOutcome> {
        let started = Instant::now();
        let mut working = request.clone();

        let (pre_request, pre_request_merge) = match self.run_pre_request_merged(&mut working, store) {
            Some((result, report)) => (Some(result), report),
            None => (None, MergeReport::default()),
        };

        let resolved = self.resolve_request(&working, store);
        let sent = transport.send(&resolved).await;
        let response = match sent {
            Ok(response) => response,
            Err(err) => {
                store.clear_locals();
                return Err(err);
            }
        };

        let (test, test_merge) = match self.run_tests_merged(&resolved, &response, store) {
            Some((result, report)) => (Some(result), report),
            None => (None, MergeReport::default()),
        };
        store.clear_locals();

        info!(
            method = %resolved.method,
            url = %resolved.url,
            status = response.status,
            tests_passed = test.as_ref().map(ScriptResult::passed_tests).unwrap_or(0),
            tests_failed = test.as_ref().map(ScriptResult::failed_tests).unwrap_or(0),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        Ok(PipelineOutcome {
            request: resolved,
            response,
            pre_request,
            test,
            pre_request_merge,
            test_merge,
        })
    }
}
