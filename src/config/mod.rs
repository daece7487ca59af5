//! Engine configuration

#[allow(clippy::module_inception)]
mod config;

pub use config::{EngineConfig, ResolverConfig, SandboxConfig, CONFIG_DIR_ENV};
