//! Pre-request and test scripts
//!
//! Scripts are JavaScript run by an embedded QuickJS engine against a
//! [`ScriptContext`] snapshot. The only way out of the sandbox is the `pm`
//! object; every outcome, including failures, comes back as a
//! [`ScriptResult`].
//!
//! - [`context`] - the snapshot handed to a script
//! - [`sandbox`] - runtime, limits and execution
//! - [`validation`] - static checks run before anything executes
//! - [`result`] - logs, test outcomes and the modified context

pub mod context;
pub mod result;
pub mod sandbox;
pub mod validation;

mod facade;
mod state;

pub use context::{ScriptContext, ScriptRequest, ScriptResponse};
pub use result::{LogLevel, ScriptLogEntry, ScriptResult, TestOutcome};
pub use sandbox::ScriptSandbox;

use std::fmt;

use crate::config::SandboxConfig;
use crate::errors::PulseScriptError;

/// Which hook a script is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    PreRequest,
    Test,
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptKind::PreRequest => write!(f, "pre-request"),
            ScriptKind::Test => write!(f, "test"),
        }
    }
}

/// Run a script in a throwaway sandbox with default limits
pub fn execute_script(kind: ScriptKind, source: &str, context: &ScriptContext) -> ScriptResult {
    match ScriptSandbox::new(&SandboxConfig::default()) {
        Ok(sandbox) => sandbox.execute(kind, source, context),
        Err(err) => ScriptResult::failed(&err, Vec::new(), Vec::new()),
    }
}

/// Check a script without running it
pub fn validate_script(source: &str) -> Result<(), PulseScriptError> {
    ScriptSandbox::new(&SandboxConfig::default())?.validate(source)
}
