//! Config file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::PulseScriptError;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "PULSESCRIPT_CONFIG_DIR";

/// Limits applied to every sandboxed script run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Wall-clock budget per script invocation
    pub timeout_ms: u64,
    /// Memory limit for the JavaScript runtime in MB
    pub memory_limit_mb: usize,
    /// Maximum interpreter stack size in KB
    pub max_stack_size_kb: usize,
    /// Scripts larger than this are rejected before validation
    pub max_script_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            memory_limit_mb: 64,
            max_stack_size_kb: 1024,
            max_script_bytes: 1_000_000,
        }
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }

    pub fn max_stack_size_bytes(&self) -> usize {
        self.max_stack_size_kb.saturating_mul(1024)
    }
}

/// Placeholder resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Number of substitution passes; 1 means resolved values are never re-scanned
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_depth: 1 }
    }
}

/// pulsescript configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sandbox: SandboxConfig,
    pub resolver: ResolverConfig,
}

impl EngineConfig {
    /// Load configuration from the config file (TOML format)
    pub fn load() -> Result<Self, PulseScriptError> {
        Self::load_from_dir(&Self::default_config_dir())
    }

    /// Load `config.toml` from a specific directory, defaulting when absent
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, PulseScriptError> {
        let config_file = config_dir.join("config.toml");

        if !config_file.exists() {
            tracing::debug!(path = %config_file.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_file)?;

        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %config_file.display(), "Loaded config");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, PulseScriptError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PulseScriptError> {
        if self.sandbox.timeout_ms == 0 {
            return Err(PulseScriptError::Config("sandbox.timeout_ms must be greater than zero".to_string()));
        }
        if self.resolver.max_depth == 0 {
            return Err(PulseScriptError::Config("resolver.max_depth must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Get the default config directory
    pub fn default_config_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .map(|p| p.join("pulsescript"))
            .unwrap_or_else(|| PathBuf::from(".pulsescript"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sandbox.timeout_ms, 30_000);
        assert_eq!(config.sandbox.memory_limit_bytes(), 64 * 1024 * 1024);
        assert_eq!(config.resolver.max_depth, 1);
    }

    #[test]
    fn test_huge_limits_saturate() {
        let sandbox = SandboxConfig {
            memory_limit_mb: usize::MAX,
            max_stack_size_kb: usize::MAX,
            ..SandboxConfig::default()
        };
        assert_eq!(sandbox.memory_limit_bytes(), usize::MAX);
        assert_eq!(sandbox.max_stack_size_bytes(), usize::MAX);
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str("[sandbox]\ntimeout_ms = 250\n").unwrap();
        assert_eq!(config.sandbox.timeout(), Duration::from_millis(250));
        assert_eq!(config.sandbox.memory_limit_mb, 64);
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = EngineConfig::from_toml_str("[sandbox]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, PulseScriptError::Config(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_toml_str("[sandbox\n").unwrap_err();
        assert!(matches!(err, PulseScriptError::Toml(_)));
    }
}
