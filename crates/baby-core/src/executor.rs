//! Run phase: execute the compiled program inside its workspace

use crate::config::{LimitsConfig, RunnerConfig};
use crate::errors::{PlaygroundError, Result};
use crate::process::{run_bounded, Bounds, ProcessOutcome};
use crate::workspace::Workspace;
use std::collections::HashMap;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct ProgramExecutor {
    bounds: Bounds,
    inherit_env: bool,
    env: HashMap<String, String>,
}

impl ProgramExecutor {
    pub fn new(runner: &RunnerConfig, limits: &LimitsConfig) -> Self {
        Self {
            bounds: Bounds {
                deadline: runner.timeout(),
                max_output_bytes: limits.max_output_bytes,
            },
            inherit_env: runner.inherit_env,
            env: runner.env.clone(),
        }
    }

    /// Run the workspace's verified executable with no arguments.
    pub async fn run(&self, workspace: &Workspace) -> Result<ProcessOutcome> {
        let executable = workspace.executable_path().ok_or_else(|| {
            PlaygroundError::InternalError(format!(
                "workspace {} has no verified executable",
                workspace.id()
            ))
        })?;

        let mut cmd = Command::new(executable);
        cmd.current_dir(workspace.path());
        if !self.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(&self.env);

        run_bounded(cmd, self.bounds).await
    }
}
