//! Error types for the compile-and-run pipeline
//!
//! These errors describe faults in the environment around a submission: a
//! compiler that cannot be launched, a workspace that cannot be created, an
//! artifact that never appeared. Faults in the submission itself are not
//! errors at all; they are ordinary `CompileResult` variants.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaygroundError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Workspace error: {0}")]
    WorkspaceError(String),
    #[error("Failed to launch '{program}': {source}")]
    SpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Compiler reported success but artifact is missing: {0}")]
    ArtifactMissing(PathBuf),
    #[error("Playground is busy: {0}")]
    Busy(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PlaygroundError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnError {
            program: program.into(),
            source,
        }
    }

    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::WorkspaceError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PlaygroundError>;
