//! The compile-and-run pipeline
//!
//! request -> acquire workspace -> compile -> (run) -> classify -> release.
//! Every request is independent; the only shared state is the workspace root
//! (made safe by unique directories) and a semaphore bounding how many
//! pipelines run at once.

use crate::classifier::classify;
use crate::compiler::CompilerInvoker;
use crate::config::PlaygroundConfig;
use crate::errors::{PlaygroundError, Result};
use crate::executor::ProgramExecutor;
use crate::types::{CompileRequest, CompileResult};
use crate::workspace::{Workspace, WorkspaceManager};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Something that turns a submission into a `CompileResult`.
///
/// Infallible by contract: every fault is folded into the result taxonomy.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn compile_and_run(&self, request: CompileRequest) -> CompileResult;
}

struct PipelineInner {
    workspaces: WorkspaceManager,
    compiler: CompilerInvoker,
    executor: ProgramExecutor,
    slots: Semaphore,
    queue_timeout: Duration,
}

/// Cheap to clone; clones share the same workspace manager and slots.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Pipeline {
    pub fn new(config: &PlaygroundConfig) -> Result<Self> {
        config.validate()?;

        let compiler = CompilerInvoker::new(&config.compiler, &config.limits);
        log::info!(
            "Pipeline using compiler {} (compile deadline {:?}, run deadline {:?})",
            compiler.program().display(),
            config.compiler.timeout(),
            config.runner.timeout()
        );

        Ok(Self {
            inner: Arc::new(PipelineInner {
                workspaces: WorkspaceManager::new(&config.workspace, &config.compiler),
                compiler,
                executor: ProgramExecutor::new(&config.runner, &config.limits),
                slots: Semaphore::new(config.limits.max_concurrent_jobs),
                queue_timeout: config.limits.queue_timeout(),
            }),
        })
    }

    pub fn workspace_root(&self) -> &std::path::Path {
        self.inner.workspaces.root()
    }

    /// Run one request end to end. Errors are converted, never returned.
    pub async fn execute(&self, request: &CompileRequest) -> CompileResult {
        let start = Instant::now();

        let _permit = match tokio::time::timeout(
            self.inner.queue_timeout,
            self.inner.slots.acquire(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return self.tooling_result(PlaygroundError::InternalError(
                    "job slots were closed".to_string(),
                ))
            }
            Err(_) => {
                return self.tooling_result(PlaygroundError::Busy(format!(
                    "no free job slot within {:?}",
                    self.inner.queue_timeout
                )))
            }
        };

        let mut workspace = match self.inner.workspaces.acquire(request.source_code()).await {
            Ok(workspace) => workspace,
            Err(e) => return self.tooling_result(e),
        };
        let id = workspace.id().clone();

        let result = match self.compile_and_run_in(&mut workspace).await {
            Ok(result) => result,
            Err(e) => self.tooling_result(e),
        };

        self.inner.workspaces.release(workspace).await;

        log::info!(
            "Workspace {} finished as {} in {:?}",
            id,
            result.kind(),
            start.elapsed()
        );
        result
    }

    async fn compile_and_run_in(&self, workspace: &mut Workspace) -> Result<CompileResult> {
        let compile = self.inner.compiler.compile(workspace).await?;

        let run = match compile.program() {
            Some(_) => Some(self.inner.executor.run(workspace).await?),
            None => None,
        };

        let result = classify(&compile, run.as_ref());
        match &result {
            CompileResult::TimedOut { phase } => {
                log::warn!("Workspace {} timed out in {} phase", workspace.id(), phase)
            }
            CompileResult::ToolingError { message } => {
                log::error!("Workspace {}: {}", workspace.id(), message)
            }
            _ => {}
        }
        Ok(result)
    }

    fn tooling_result(&self, error: PlaygroundError) -> CompileResult {
        log::error!("Tooling failure: {}", error);
        CompileResult::tooling(error.to_string())
    }
}

#[async_trait]
impl CodeRunner for Pipeline {
    async fn compile_and_run(&self, request: CompileRequest) -> CompileResult {
        self.execute(&request).await
    }
}
