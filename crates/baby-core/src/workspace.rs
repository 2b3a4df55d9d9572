//! Per-request workspaces
//!
//! Every request gets its own directory holding its source, assembly and
//! executable. Nothing is shared between requests, so concurrent submissions
//! can never read or run each other's artifacts. Directories are created
//! exclusively and removed on every exit path: explicitly through
//! [`WorkspaceManager::release`], or by the directory guard on drop when a
//! request is cancelled or panics first.

use crate::config::{CompilerConfig, WorkspaceConfig};
use crate::errors::{PlaygroundError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tempfile::{Builder, TempDir};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Monotonic counter plus random entropy; unique for the life of the process
/// and collision-resistant across restarts sharing a root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    fn next(counter: &AtomicU64) -> Self {
        let seq = counter.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:06}-{}", seq, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Artifacts produced by a successful compile phase.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub assembly_path: PathBuf,
    pub executable_path: PathBuf,
}

pub struct Workspace {
    id: WorkspaceId,
    dir: TempDir,
    source_path: PathBuf,
    assembly_name: String,
    executable_name: String,
    artifacts: Option<Artifacts>,
}

impl Workspace {
    pub fn id(&self) -> &WorkspaceId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Where the compiler is expected to write the assembly text.
    pub fn expected_assembly_path(&self) -> PathBuf {
        self.dir.path().join(&self.assembly_name)
    }

    /// Where the compiler is expected to write the executable.
    pub fn expected_executable_path(&self) -> PathBuf {
        self.dir.path().join(&self.executable_name)
    }

    /// Populated only after the compile phase verified both artifacts.
    pub fn assembly_path(&self) -> Option<&Path> {
        self.artifacts.as_ref().map(|a| a.assembly_path.as_path())
    }

    /// Populated only after the compile phase verified both artifacts.
    pub fn executable_path(&self) -> Option<&Path> {
        self.artifacts.as_ref().map(|a| a.executable_path.as_path())
    }

    /// Check that both artifacts exist as regular files and record them.
    pub async fn verify_artifacts(&mut self) -> Result<Artifacts> {
        let assembly_path = self.expected_assembly_path();
        let executable_path = self.expected_executable_path();

        for path in [&assembly_path, &executable_path] {
            match fs::metadata(path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => return Err(PlaygroundError::ArtifactMissing(path.clone())),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(PlaygroundError::ArtifactMissing(path.clone()))
                }
                Err(e) => return Err(e.into()),
            }
        }

        let artifacts = Artifacts {
            assembly_path,
            executable_path,
        };
        self.artifacts = Some(artifacts.clone());
        Ok(artifacts)
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("path", &self.dir.path())
            .field("artifacts", &self.artifacts)
            .finish()
    }
}

/// Allocates and tears down workspaces under a common root.
#[derive(Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
    prefix: String,
    source_file: String,
    assembly_file: String,
    executable_file: String,
    io_timeout: Duration,
    counter: AtomicU64,
}

impl WorkspaceManager {
    pub fn new(workspace: &WorkspaceConfig, compiler: &CompilerConfig) -> Self {
        Self {
            root: workspace.resolved_root(),
            prefix: workspace.prefix.clone(),
            source_file: compiler.source_file.clone(),
            assembly_file: compiler.assembly_file.clone(),
            executable_file: compiler.executable_file.clone(),
            io_timeout: workspace.io_timeout(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh workspace and write the submitted source into it.
    pub async fn acquire(&self, source_code: &str) -> Result<Workspace> {
        match tokio::time::timeout(self.io_timeout, self.create(source_code)).await {
            Ok(result) => result,
            Err(_) => Err(PlaygroundError::workspace(format!(
                "creating workspace under {} exceeded {:?}",
                self.root.display(),
                self.io_timeout
            ))),
        }
    }

    async fn create(&self, source_code: &str) -> Result<Workspace> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            PlaygroundError::workspace(format!(
                "cannot create workspace root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let id = WorkspaceId::next(&self.counter);
        let prefix = format!("{}{}-", self.prefix, id);
        let root = self.root.clone();
        let dir = tokio::task::spawn_blocking(move || {
            Builder::new().prefix(&prefix).rand_bytes(4).tempdir_in(&root)
        })
        .await
        .map_err(|e| PlaygroundError::InternalError(format!("workspace task failed: {}", e)))?
        .map_err(|e| {
            PlaygroundError::workspace(format!(
                "cannot create workspace in {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let source_path = dir.path().join(&self.source_file);
        let mut file = fs::File::create(&source_path).await?;
        file.write_all(source_code.as_bytes()).await?;
        file.flush().await?;

        log::debug!("Acquired workspace {} at {}", id, dir.path().display());

        Ok(Workspace {
            id,
            dir,
            source_path,
            assembly_name: self.assembly_file.clone(),
            executable_name: self.executable_file.clone(),
            artifacts: None,
        })
    }

    /// Remove the workspace tree. Never fails: problems are logged so they
    /// cannot replace the request's real outcome.
    pub async fn release(&self, workspace: Workspace) {
        let Workspace { id, dir, .. } = workspace;
        let path = dir.path().to_path_buf();

        let removal = tokio::task::spawn_blocking(move || dir.close());
        match tokio::time::timeout(self.io_timeout, removal).await {
            Ok(Ok(Ok(()))) => log::debug!("Released workspace {}", id),
            Ok(Ok(Err(e))) => log::warn!(
                "Failed to remove workspace {} at {}: {}",
                id,
                path.display(),
                e
            ),
            Ok(Err(e)) => log::warn!("Workspace {} cleanup task failed: {}", id, e),
            Err(_) => log::warn!(
                "Removing workspace {} at {} exceeded {:?}",
                id,
                path.display(),
                self.io_timeout
            ),
        }
    }
}
