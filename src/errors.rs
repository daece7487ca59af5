//! Error types for pulsescript

use thiserror::Error;

/// Main error type for pulsescript
#[derive(Error, Debug)]
pub enum PulseScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Script(String),

    /// The script referenced a denied capability and was never executed
    #[error("{0}")]
    Forbidden(String),

    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("Script execution timed out after {0} ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Assertion(String),
}

impl PulseScriptError {
    /// Whether the error was raised before any script code ran
    pub fn is_validation(&self) -> bool {
        matches!(self, PulseScriptError::Forbidden(_) | PulseScriptError::Syntax(_))
    }
}

impl From<rquickjs::Error> for PulseScriptError {
    fn from(err: rquickjs::Error) -> Self {
        PulseScriptError::Script(format!("JavaScript error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, PulseScriptError>;
