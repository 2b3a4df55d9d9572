//! Configuration type definitions for the playground
//!
//! Every section and field carries a default, so an empty YAML document is a
//! complete configuration. Durations are expressed in milliseconds to keep the
//! YAML flat and to let tests use sub-second deadlines.

use crate::errors::PlaygroundError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the external compiler is invoked and what it leaves behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_compiler_path")]
    pub path: PathBuf,
    /// Arguments placed before the source path.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_compile_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_source_file")]
    pub source_file: String,
    #[serde(default = "default_assembly_file")]
    pub assembly_file: String,
    #[serde(default = "default_executable_file")]
    pub executable_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_run_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub inherit_env: bool,
    #[serde(default = "default_runner_env")]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent directory for per-request workspaces; the OS temp dir when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_workspace_prefix")]
    pub prefix: String,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            path: default_compiler_path(),
            args: Vec::new(),
            timeout_ms: default_compile_timeout_ms(),
            source_file: default_source_file(),
            assembly_file: default_assembly_file(),
            executable_file: default_executable_file(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_run_timeout_ms(),
            inherit_env: false,
            env: default_runner_env(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefix: default_workspace_prefix(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: default_max_output_bytes(),
            max_source_bytes: default_max_source_bytes(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            queue_timeout_ms: default_queue_timeout_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_cors: true,
            cors_origins: None,
            max_body_size: default_max_body_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CompilerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl WorkspaceConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn resolved_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl LimitsConfig {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }
}

impl PlaygroundConfig {
    /// Reject configurations the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), PlaygroundError> {
        if self.compiler.path.as_os_str().is_empty() {
            return Err(PlaygroundError::ConfigError(
                "compiler.path must not be empty".to_string(),
            ));
        }
        if self.compiler.timeout_ms == 0 {
            return Err(PlaygroundError::ConfigError(
                "compiler.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.runner.timeout_ms == 0 {
            return Err(PlaygroundError::ConfigError(
                "runner.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.workspace.io_timeout_ms == 0 {
            return Err(PlaygroundError::ConfigError(
                "workspace.io_timeout_ms must be greater than zero".to_string(),
            ));
        }

        let names = [
            ("compiler.source_file", &self.compiler.source_file),
            ("compiler.assembly_file", &self.compiler.assembly_file),
            ("compiler.executable_file", &self.compiler.executable_file),
        ];
        for (field, name) in names {
            validate_file_name(field, name)?;
        }
        if self.compiler.source_file == self.compiler.assembly_file
            || self.compiler.source_file == self.compiler.executable_file
            || self.compiler.assembly_file == self.compiler.executable_file
        {
            return Err(PlaygroundError::ConfigError(
                "source, assembly and executable file names must be distinct".to_string(),
            ));
        }

        if self.workspace.prefix.contains('/')
            || self.workspace.prefix.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(PlaygroundError::ConfigError(
                "workspace.prefix must not contain a path separator".to_string(),
            ));
        }

        if self.limits.max_output_bytes == 0 {
            return Err(PlaygroundError::ConfigError(
                "limits.max_output_bytes must be greater than zero".to_string(),
            ));
        }
        if self.limits.max_source_bytes == 0 {
            return Err(PlaygroundError::ConfigError(
                "limits.max_source_bytes must be greater than zero".to_string(),
            ));
        }
        if self.limits.max_concurrent_jobs == 0 {
            return Err(PlaygroundError::ConfigError(
                "limits.max_concurrent_jobs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_file_name(field: &str, name: &str) -> Result<(), PlaygroundError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(PlaygroundError::ConfigError(format!(
            "{} must be a plain file name, got '{}'",
            field, name
        )));
    }
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(PlaygroundError::ConfigError(format!(
            "{} must not contain a path separator, got '{}'",
            field, name
        )));
    }
    Ok(())
}

fn default_compiler_path() -> PathBuf {
    PathBuf::from("baby")
}

fn default_compile_timeout_ms() -> u64 {
    10_000
}

fn default_run_timeout_ms() -> u64 {
    5_000
}

fn default_io_timeout_ms() -> u64 {
    5_000
}

fn default_source_file() -> String {
    "main.by".to_string()
}

fn default_assembly_file() -> String {
    "out.asm".to_string()
}

fn default_executable_file() -> String {
    "out".to_string()
}

fn default_runner_env() -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("PATH".to_string(), "/usr/local/bin:/usr/bin:/bin".to_string());
    env
}

fn default_workspace_prefix() -> String {
    "baby-".to_string()
}

fn default_max_output_bytes() -> usize {
    64 * 1024
}

fn default_max_source_bytes() -> usize {
    256 * 1024
}

fn default_max_concurrent_jobs() -> usize {
    32
}

fn default_queue_timeout_ms() -> u64 {
    30_000
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
