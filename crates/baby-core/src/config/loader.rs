//! Configuration loader for YAML files and environment overrides
//!
//! Loading is three steps: parse YAML, apply `BABY_*` environment overrides,
//! validate. The loaded config is immutable for the lifetime of the server.

use crate::config::types::PlaygroundConfig;
use crate::errors::PlaygroundError;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const ENV_COMPILER: &str = "BABY_COMPILER";
pub const ENV_WORKSPACE_ROOT: &str = "BABY_WORKSPACE_ROOT";
pub const ENV_COMPILE_TIMEOUT_MS: &str = "BABY_COMPILE_TIMEOUT_MS";
pub const ENV_RUN_TIMEOUT_MS: &str = "BABY_RUN_TIMEOUT_MS";
pub const ENV_BIND_ADDR: &str = "BABY_BIND_ADDR";
pub const ENV_LOG_LEVEL: &str = "BABY_LOG_LEVEL";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<PlaygroundConfig, PlaygroundError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            PlaygroundError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<PlaygroundConfig, PlaygroundError> {
        let mut config: PlaygroundConfig = if content.trim().is_empty() {
            PlaygroundConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                PlaygroundError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        Self::apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a config file
    pub fn from_env() -> Result<PlaygroundConfig, PlaygroundError> {
        Self::from_str("")
    }

    fn apply_env_overrides(config: &mut PlaygroundConfig) -> Result<(), PlaygroundError> {
        if let Ok(compiler) = env::var(ENV_COMPILER) {
            log::debug!("Compiler path overridden from {}", ENV_COMPILER);
            config.compiler.path = PathBuf::from(compiler);
        }
        if let Ok(root) = env::var(ENV_WORKSPACE_ROOT) {
            config.workspace.root = Some(PathBuf::from(root));
        }
        if let Some(ms) = Self::env_millis(ENV_COMPILE_TIMEOUT_MS)? {
            config.compiler.timeout_ms = ms;
        }
        if let Some(ms) = Self::env_millis(ENV_RUN_TIMEOUT_MS)? {
            config.runner.timeout_ms = ms;
        }
        if let Ok(addr) = env::var(ENV_BIND_ADDR) {
            config.server.bind_addr = addr;
        }
        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }
        Ok(())
    }

    fn env_millis(key: &str) -> Result<Option<u64>, PlaygroundError> {
        match env::var(key) {
            Ok(value) => value.trim().parse::<u64>().map(Some).map_err(|e| {
                PlaygroundError::ConfigError(format!(
                    "Invalid value '{}' for {}: {}",
                    value, key, e
                ))
            }),
            Err(_) => Ok(None),
        }
    }
}

/// Make a relative compiler path that names a file absolute, because the
/// compiler runs with the workspace as its working directory. Bare program
/// names are left for `PATH` lookup.
pub fn resolve_compiler_path(path: &Path) -> PathBuf {
    if path.is_absolute() || path.components().count() <= 1 {
        return path.to_path_buf();
    }
    match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) => {
            log::warn!(
                "Could not resolve compiler path {}: {}",
                path.display(),
                e
            );
            env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    }
}
