//! pulsescript library interface
//!
//! Scoped variables, `{{placeholder}}` resolution and sandboxed pre-request
//! and test scripts for an HTTP client.
//!
//! # Module Organization
//!
//! - [`variables`] - Variable store, dynamic values and the resolver
//! - [`request`] - Request and response models
//! - [`scripting`] - The QuickJS sandbox and the `pm` object
//! - [`assertion`] - Expectation checks behind `pm.expect`
//! - [`merge`] - Writing script changes back into live state
//! - [`pipeline`] - pre-request → send → test flow
//! - [`errors`] - Error types (PulseScriptError, Result)

pub mod assertion;
pub mod config;
pub mod errors;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod request;
pub mod scripting;
pub mod variables;

pub use config::EngineConfig;
pub use errors::{PulseScriptError, Result};
pub use merge::{merge_variables, MergeReport};
pub use pipeline::{PipelineOutcome, RequestPipeline, Transport};
pub use request::{Request, RequestBody, Response};
pub use scripting::{execute_script, ScriptContext, ScriptKind, ScriptResult, ScriptSandbox};
pub use variables::{resolve, Resolver, VariableScope, VariableStore};
