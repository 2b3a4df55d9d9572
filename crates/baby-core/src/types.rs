//! Request and result types shared by the pipeline and its callers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single submission. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    source_code: String,
}

impl CompileRequest {
    pub fn new(source_code: impl Into<String>) -> Self {
        Self {
            source_code: source_code.into(),
        }
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }
}

/// The two external-process phases of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Compile,
    Run,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Compile => write!(f, "compile"),
            Phase::Run => write!(f, "run"),
        }
    }
}

/// The single outcome of a request. Exactly one variant describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompileResult {
    Success {
        program_output: String,
        assembly: String,
        /// Exit code chosen by the program, e.g. through `bye(code)`.
        exit_code: i32,
    },
    CompileError {
        diagnostics: String,
    },
    RuntimeError {
        diagnostics: String,
        partial_output: String,
        exit_code: Option<i32>,
    },
    ToolingError {
        message: String,
    },
    TimedOut {
        phase: Phase,
    },
}

impl CompileResult {
    pub fn tooling(message: impl Into<String>) -> Self {
        CompileResult::ToolingError {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompileResult::Success { .. })
    }

    /// Stable snake_case name of the variant, used in responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileResult::Success { .. } => "success",
            CompileResult::CompileError { .. } => "compile_error",
            CompileResult::RuntimeError { .. } => "runtime_error",
            CompileResult::ToolingError { .. } => "tooling_error",
            CompileResult::TimedOut { .. } => "timed_out",
        }
    }
}
