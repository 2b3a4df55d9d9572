//! Wire shapes for `/compile`

use baby_core::{CompileResult, Phase};
use serde::{Deserialize, Serialize};

/// Inbound body. `code` is optional here so a missing field can be reported
/// as a validation failure instead of a generic deserialization error.
#[derive(Debug, Deserialize)]
pub struct CompileBody {
    #[serde(default)]
    pub code: Option<String>,
}

/// Outbound body. `assembly` only appears on success and `errors` only on
/// failure, so a response never carries both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResponse {
    pub success: bool,
    pub status: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

impl From<CompileResult> for CompileResponse {
    fn from(result: CompileResult) -> Self {
        let status = result.kind().to_string();
        match result {
            CompileResult::Success {
                program_output,
                assembly,
                exit_code,
            } => Self {
                success: true,
                status,
                output: program_output,
                assembly: Some(assembly),
                errors: None,
                exit_code: Some(exit_code),
                phase: None,
            },
            CompileResult::CompileError { diagnostics } => Self {
                success: false,
                status,
                output: String::new(),
                assembly: None,
                errors: Some(diagnostics),
                exit_code: None,
                phase: None,
            },
            CompileResult::RuntimeError {
                diagnostics,
                partial_output,
                exit_code,
            } => Self {
                success: false,
                status,
                output: partial_output,
                assembly: None,
                errors: Some(format!("Runtime Error:\n{}", diagnostics)),
                exit_code,
                phase: None,
            },
            CompileResult::ToolingError { message } => Self {
                success: false,
                status,
                output: String::new(),
                assembly: None,
                errors: Some(format!("Playground tooling failure: {}", message)),
                exit_code: None,
                phase: None,
            },
            CompileResult::TimedOut { phase } => Self {
                success: false,
                status,
                output: String::new(),
                assembly: None,
                errors: Some(match phase {
                    Phase::Compile => "Timed out while compiling".to_string(),
                    Phase::Run => "Timed out while running the program".to_string(),
                }),
                exit_code: None,
                phase: Some(phase),
            },
        }
    }
}
