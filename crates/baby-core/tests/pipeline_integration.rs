//! End-to-end pipeline tests against a stand-in compiler.
//!
//! The stand-in is a shell script invoked as `/bin/sh compiler.sh <source>`.
//! It "compiles" a submission by copying it into an executable shell script
//! named `out` and writing a commented copy to `out.asm`, so test sources are
//! shell snippets. Marker comments make it misbehave on demand.
#![cfg(unix)]

use baby_core::config::PlaygroundConfig;
use baby_core::{CodeRunner, CompileRequest, CompileResult, Phase, Pipeline};
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FAKE_COMPILER: &str = r#"
src="$1"
if grep -q '#compile-error' "$src"; then
    echo "main.by:1:7: error: unterminated string literal" >&2
    exit 1
fi
if grep -q '#silent-failure' "$src"; then
    exit 4
fi
if grep -q '#compiler-hang' "$src"; then
    while :; do :; done
fi
if grep -q '#no-artifact' "$src"; then
    exit 0
fi
{
    echo 'global _start'
    echo '_start:'
    sed 's/^/    ; /' "$src"
} > out.asm
{
    echo '#!/bin/sh'
    cat "$src"
} > out
if grep -q '#no-exec' "$src"; then
    exit 0
fi
chmod +x out
"#;

const MOVEON_PROGRAM: &str = r#"
vibes=100
mood="chilling"
if [ $vibes -gt 0 ]; then
    echo "We are currently $mood"
else
    echo "No vibes found."
fi
i=0
while [ $i -lt 3 ]; do
    echo $i
    i=$((i + 1))
done
exit 0
"#;

struct Harness {
    _dir: TempDir,
    workspace_root: PathBuf,
    pipeline: Pipeline,
}

impl Harness {
    fn new() -> Self {
        Self::with(|_| {})
    }

    fn with(customize: impl FnOnce(&mut PlaygroundConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("compiler.sh");
        std::fs::write(&script, FAKE_COMPILER).unwrap();
        let workspace_root = dir.path().join("workspaces");

        let mut config = PlaygroundConfig::default();
        config.compiler.path = PathBuf::from("/bin/sh");
        config.compiler.args = vec![script.display().to_string()];
        config.compiler.timeout_ms = 5_000;
        config.runner.timeout_ms = 2_000;
        config.workspace.root = Some(workspace_root.clone());
        customize(&mut config);

        let pipeline = Pipeline::new(&config).unwrap();
        Self {
            _dir: dir,
            workspace_root,
            pipeline,
        }
    }

    async fn submit(&self, source: &str) -> CompileResult {
        self.pipeline
            .compile_and_run(CompileRequest::new(source))
            .await
    }

    fn assert_no_workspaces_left(&self) {
        assert!(
            is_empty_dir(&self.workspace_root),
            "workspace directories left behind in {}",
            self.workspace_root.display()
        );
    }
}

fn is_empty_dir(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => e.kind() == std::io::ErrorKind::NotFound,
    }
}

#[tokio::test]
async fn test_moveon_branch_with_bounded_loop_succeeds() {
    let harness = Harness::new();

    let result = harness.submit(MOVEON_PROGRAM).await;

    match result {
        CompileResult::Success {
            program_output,
            assembly,
            exit_code,
        } => {
            assert_eq!(program_output, "We are currently chilling\n0\n1\n2\n");
            assert!(assembly.starts_with("global _start"));
            assert_eq!(exit_code, 0);
        }
        other => panic!("expected success, got {:?}", other),
    }
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_rejected_source_is_compile_error() {
    let harness = Harness::new();

    let result = harness.submit("#compile-error\necho \"never closed\n").await;

    match result {
        CompileResult::CompileError { diagnostics } => {
            assert!(diagnostics.contains("unterminated string literal"));
        }
        other => panic!("expected compile error, got {:?}", other),
    }
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_silent_compiler_failure_still_has_diagnostics() {
    let harness = Harness::new();

    match harness.submit("#silent-failure\n").await {
        CompileResult::CompileError { diagnostics } => assert!(!diagnostics.is_empty()),
        other => panic!("expected compile error, got {:?}", other),
    }
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_success_without_artifacts_is_tooling_error() {
    let harness = Harness::new();

    match harness.submit("#no-artifact\necho hi\n").await {
        CompileResult::ToolingError { message } => assert!(message.contains("out.asm")),
        other => panic!("expected tooling error, got {:?}", other),
    }
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_unlaunchable_executable_is_tooling_error() {
    let harness = Harness::new();

    match harness.submit("#no-exec\necho hi\n").await {
        CompileResult::ToolingError { message } => {
            assert!(message.contains("Failed to launch"), "{}", message)
        }
        other => panic!("expected tooling error, got {:?}", other),
    }
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_missing_compiler_is_tooling_error() {
    let harness = Harness::with(|config| {
        config.compiler.path = PathBuf::from("/nonexistent/bin/baby");
        config.compiler.args.clear();
    });

    match harness.submit("echo hi\n").await {
        CompileResult::ToolingError { message } => {
            assert!(message.contains("/nonexistent/bin/baby"))
        }
        other => panic!("expected tooling error, got {:?}", other),
    }
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_hanging_compiler_times_out() {
    let harness = Harness::with(|config| config.compiler.timeout_ms = 400);

    let start = Instant::now();
    let result = harness.submit("#compiler-hang\n").await;

    assert_eq!(
        result,
        CompileResult::TimedOut {
            phase: Phase::Compile
        }
    );
    assert!(start.elapsed() < Duration::from_millis(400) + Duration::from_secs(3));
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_endless_program_times_out_within_deadline() {
    let harness = Harness::with(|config| config.runner.timeout_ms = 400);

    let start = Instant::now();
    let result = harness.submit("i=0\nwhile :; do i=$((i + 1)); done\n").await;

    assert_eq!(result, CompileResult::TimedOut { phase: Phase::Run });
    assert!(start.elapsed() < Duration::from_millis(400) + Duration::from_secs(3));
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_stderr_output_is_runtime_error() {
    let harness = Harness::new();

    let result = harness
        .submit("echo before\necho 'stack smashed' >&2\nexit 2\n")
        .await;

    assert_eq!(
        result,
        CompileResult::RuntimeError {
            diagnostics: "stack smashed\n".to_string(),
            partial_output: "before\n".to_string(),
            exit_code: Some(2),
        }
    );
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_chosen_exit_code_is_success() {
    let harness = Harness::new();

    match harness.submit("echo leaving\nexit 7\n").await {
        CompileResult::Success {
            program_output,
            exit_code,
            ..
        } => {
            assert_eq!(program_output, "leaving\n");
            assert_eq!(exit_code, 7);
        }
        other => panic!("expected success, got {:?}", other),
    }
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_program_runs_with_cleared_environment() {
    std::env::set_var("BABY_TEST_LEAK", "visible");
    let harness = Harness::new();

    match harness.submit("echo \"leak=${BABY_TEST_LEAK:-none}\"\n").await {
        CompileResult::Success { program_output, .. } => {
            assert_eq!(program_output, "leak=none\n")
        }
        other => panic!("expected success, got {:?}", other),
    }
    std::env::remove_var("BABY_TEST_LEAK");
    harness.assert_no_workspaces_left();
}

#[tokio::test]
async fn test_identical_requests_are_deterministic() {
    let harness = Harness::new();

    let first = harness.submit(MOVEON_PROGRAM).await;
    let second = harness.submit(MOVEON_PROGRAM).await;

    assert_eq!(first, second);
    assert!(first.is_success());
    harness.assert_no_workspaces_left();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_isolated() {
    let harness = Harness::new();

    let submissions = (0..50).map(|i| {
        let source = format!("echo sentinel-{:03}\n", i);
        let harness = &harness;
        async move { (i, harness.submit(&source).await) }
    });
    let results = join_all(submissions).await;

    for (i, result) in results {
        let sentinel = format!("sentinel-{:03}", i);
        match result {
            CompileResult::Success {
                program_output,
                assembly,
                ..
            } => {
                assert_eq!(program_output, format!("{}\n", sentinel));
                assert!(assembly.contains(&sentinel));
                assert_eq!(assembly.matches("sentinel-").count(), 1);
            }
            other => panic!("request {} expected success, got {:?}", i, other),
        }
    }
    harness.assert_no_workspaces_left();
}
