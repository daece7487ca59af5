//! What a script invocation hands back to the caller

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::context::ScriptContext;
use crate::errors::PulseScriptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Log,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Log => "log",
        };
        f.write_str(s)
    }
}

/// One line of script output, in the order it was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl ScriptLogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Outcome of one `pm.test(name, fn)` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResult {
    /// The script ran to completion; failed `pm.test` blocks do not clear this
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<ScriptLogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_context: Option<ScriptContext>,
    #[serde(default)]
    pub tests: Vec<TestOutcome>,
}

impl ScriptResult {
    pub(crate) fn completed(logs: Vec<ScriptLogEntry>, context: ScriptContext, tests: Vec<TestOutcome>) -> Self {
        Self {
            success: true,
            error: None,
            logs,
            modified_context: Some(context),
            tests,
        }
    }

    /// A script that was rejected or threw; logs collected so far are kept
    pub(crate) fn failed(err: &PulseScriptError, mut logs: Vec<ScriptLogEntry>, tests: Vec<TestOutcome>) -> Self {
        let message = err.to_string();
        logs.push(ScriptLogEntry::new(
            LogLevel::Error,
            format!("Script execution error: {}", message),
        ));
        Self {
            success: false,
            error: Some(message),
            logs,
            modified_context: None,
            tests,
        }
    }

    pub fn passed_tests(&self) -> usize {
        self.tests.iter().filter(|t| t.passed).count()
    }

    pub fn failed_tests(&self) -> usize {
        self.tests.iter().filter(|t| !t.passed).count()
    }

    /// Completed and no test block failed
    pub fn all_passed(&self) -> bool {
        self.success && self.failed_tests() == 0
    }

    pub fn logs_at(&self, level: LogLevel) -> impl Iterator<Item = &ScriptLogEntry> {
        self.logs.iter().filter(move |entry| entry.level == level)
    }
}
