//! Compile phase: invoke the external compiler inside a workspace
//!
//! The compiler contract is `<compiler> [args..] <source-path>` run with the
//! workspace as working directory. On success it leaves an assembly file and
//! an executable there. Its exit code alone is not trusted: both artifacts are
//! checked before the phase counts as successful.

use crate::config::{resolve_compiler_path, CompilerConfig, LimitsConfig};
use crate::errors::{PlaygroundError, Result};
use crate::process::{run_bounded, Bounds, ProcessOutcome};
use crate::workspace::Workspace;
use std::path::PathBuf;
use tokio::process::Command;

/// A verified compile artifact pair.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub assembly: String,
    pub executable_path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum ArtifactStatus {
    /// The compiler failed or timed out, so nothing was looked for.
    NotChecked,
    Missing(PathBuf),
    Present(CompiledProgram),
}

#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub process: ProcessOutcome,
    pub artifacts: ArtifactStatus,
}

impl CompileOutcome {
    pub fn program(&self) -> Option<&CompiledProgram> {
        match &self.artifacts {
            ArtifactStatus::Present(program) => Some(program),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerInvoker {
    program: PathBuf,
    args: Vec<String>,
    bounds: Bounds,
}

impl CompilerInvoker {
    pub fn new(compiler: &CompilerConfig, limits: &LimitsConfig) -> Self {
        Self {
            program: resolve_compiler_path(&compiler.path),
            args: compiler.args.clone(),
            bounds: Bounds {
                deadline: compiler.timeout(),
                max_output_bytes: limits.max_output_bytes,
            },
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    fn command(&self, workspace: &Workspace) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(workspace.source_path())
            .current_dir(workspace.path());
        cmd
    }

    /// Run the compiler against the workspace's source file.
    pub async fn compile(&self, workspace: &mut Workspace) -> Result<CompileOutcome> {
        let process = run_bounded(self.command(workspace), self.bounds).await?;

        if !process.exited_cleanly() {
            return Ok(CompileOutcome {
                process,
                artifacts: ArtifactStatus::NotChecked,
            });
        }
        if !process.stderr.trim().is_empty() {
            log::debug!(
                "Compiler succeeded with stderr output in workspace {}: {}",
                workspace.id(),
                process.stderr.trim()
            );
        }

        let artifacts = match workspace.verify_artifacts().await {
            Ok(found) => {
                let bytes = tokio::fs::read(&found.assembly_path).await?;
                ArtifactStatus::Present(CompiledProgram {
                    assembly: String::from_utf8_lossy(&bytes).into_owned(),
                    executable_path: found.executable_path,
                })
            }
            Err(PlaygroundError::ArtifactMissing(path)) => {
                log::error!(
                    "Compiler {} exited 0 but {} was not produced",
                    self.program.display(),
                    path.display()
                );
                ArtifactStatus::Missing(path)
            }
            Err(e) => return Err(e),
        };

        Ok(CompileOutcome { process, artifacts })
    }
}
