//! Reduce the compile and run phases to a single `CompileResult`
//!
//! Pure: no I/O, no logging. Decision order:
//!
//! | compile            | artifacts | run                 | result          |
//! |--------------------|-----------|---------------------|-----------------|
//! | timed out          | -         | -                   | TimedOut(compile) |
//! | exit != 0 / signal | -         | -                   | CompileError    |
//! | exit 0             | missing   | -                   | ToolingError    |
//! | exit 0             | present   | timed out           | TimedOut(run)   |
//! | exit 0             | present   | signal              | RuntimeError    |
//! | exit 0             | present   | stderr non-empty    | RuntimeError    |
//! | exit 0             | present   | stderr empty        | Success         |
//!
//! A non-zero program exit with empty stderr is the program's own choice
//! (`bye(code)`) and is a `Success` carrying that code.

use crate::compiler::{ArtifactStatus, CompileOutcome};
use crate::process::{ProcessOutcome, Termination};
use crate::types::{CompileResult, Phase};

pub fn classify(compile: &CompileOutcome, run: Option<&ProcessOutcome>) -> CompileResult {
    match compile.process.termination {
        Termination::TimedOut => {
            return CompileResult::TimedOut {
                phase: Phase::Compile,
            }
        }
        Termination::Signaled(signal) => {
            return CompileResult::CompileError {
                diagnostics: join_diagnostics(
                    &compile.process.stderr,
                    &format!("Compiler terminated by {}", describe_signal(signal)),
                ),
            }
        }
        Termination::Exited(code) if code != 0 => {
            return CompileResult::CompileError {
                diagnostics: compile_diagnostics(&compile.process, code),
            }
        }
        Termination::Exited(_) => {}
    }

    let program = match &compile.artifacts {
        ArtifactStatus::Present(program) => program,
        ArtifactStatus::Missing(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            return CompileResult::tooling(format!(
                "Compiler reported success but artifact '{}' is missing",
                name
            ));
        }
        ArtifactStatus::NotChecked => {
            return CompileResult::tooling("Compile artifacts were never verified")
        }
    };

    let run = match run {
        Some(run) => run,
        None => return CompileResult::tooling("Compiled program was not run"),
    };

    match run.termination {
        Termination::TimedOut => CompileResult::TimedOut { phase: Phase::Run },
        Termination::Signaled(signal) => CompileResult::RuntimeError {
            diagnostics: join_diagnostics(
                &run.stderr,
                &format!("Program terminated by {}", describe_signal(signal)),
            ),
            partial_output: run.stdout.clone(),
            exit_code: None,
        },
        Termination::Exited(code) if !run.stderr.is_empty() => {
            CompileResult::RuntimeError {
                diagnostics: run.stderr.clone(),
                partial_output: run.stdout.clone(),
                exit_code: Some(code),
            }
        }
        Termination::Exited(code) => CompileResult::Success {
            program_output: run.stdout.clone(),
            assembly: program.assembly.clone(),
            exit_code: code,
        },
    }
}

fn compile_diagnostics(process: &ProcessOutcome, code: i32) -> String {
    if !process.stderr.trim().is_empty() {
        process.stderr.clone()
    } else if !process.stdout.trim().is_empty() {
        process.stdout.clone()
    } else {
        format!("Compiler exited with status {} and no diagnostics", code)
    }
}

fn join_diagnostics(stderr: &str, note: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        note.to_string()
    } else {
        format!("{}\n{}", stderr, note)
    }
}

#[cfg(unix)]
fn describe_signal(signal: i32) -> String {
    match nix::sys::signal::Signal::try_from(signal) {
        Ok(sig) => format!("signal {} ({})", signal, sig.as_str()),
        Err(_) => format!("signal {}", signal),
    }
}

#[cfg(not(unix))]
fn describe_signal(signal: i32) -> String {
    format!("signal {}", signal)
}
