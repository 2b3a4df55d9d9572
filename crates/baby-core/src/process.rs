//! Deadline-bounded external process invocation
//!
//! Both the compiler and the compiled program go through [`run_bounded`]:
//! spawn in a fresh process group, read stdout and stderr concurrently up to a
//! byte ceiling, wait for exit until the deadline, and on expiry kill the
//! whole group. No step waits without a bound.

use crate::errors::{PlaygroundError, Result};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// How long stream readers may run on after the process is gone.
const READER_GRACE: Duration = Duration::from_millis(500);

pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

/// How a process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(i32),
    TimedOut,
}

/// Captured result of one external-process invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self.termination {
            Termination::Exited(code) => Some(code),
            _ => None,
        }
    }

    pub fn exceeded_deadline(&self) -> bool {
        self.termination == Termination::TimedOut
    }

    pub fn exited_cleanly(&self) -> bool {
        self.termination == Termination::Exited(0)
    }
}

/// Limits applied to one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub deadline: Duration,
    pub max_output_bytes: usize,
}

/// Spawn `command` and collect its outcome within `bounds`.
///
/// Launch failures (missing binary, permission denied) are returned as
/// [`PlaygroundError::SpawnError`]; everything after a successful spawn is
/// reported through the [`ProcessOutcome`].
pub async fn run_bounded(mut command: Command, bounds: Bounds) -> Result<ProcessOutcome> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    log::debug!("Spawning {:?} with deadline {:?}", command.as_std(), bounds.deadline);

    let start = Instant::now();
    let mut child = command
        .spawn()
        .map_err(|e| PlaygroundError::spawn(program.clone(), e))?;
    let group = child.id();

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PlaygroundError::InternalError("stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| PlaygroundError::InternalError("stderr was not captured".to_string()))?;
    let stdout_capture = StreamCapture::new(bounds.max_output_bytes);
    let stderr_capture = StreamCapture::new(bounds.max_output_bytes);
    let stdout_reader = tokio::spawn(read_capped(stdout, stdout_capture.clone()));
    let stderr_reader = tokio::spawn(read_capped(stderr, stderr_capture.clone()));

    let termination = match tokio::time::timeout(bounds.deadline, child.wait()).await {
        Ok(Ok(status)) => {
            // Stragglers left in the group would otherwise hold the pipes open.
            kill_group(group);
            termination_from(status)
        }
        Ok(Err(e)) => {
            kill_group(group);
            kill_tree(&mut child).await;
            stdout_reader.abort();
            stderr_reader.abort();
            return Err(PlaygroundError::InternalError(format!(
                "waiting for '{}' failed: {}",
                program, e
            )));
        }
        Err(_) => {
            log::warn!("'{}' exceeded its deadline of {:?}", program, bounds.deadline);
            kill_group(group);
            kill_tree(&mut child).await;
            Termination::TimedOut
        }
    };
    let duration = start.elapsed();

    let stdout = collect(stdout_reader, &stdout_capture, "stdout").await;
    let stderr = collect(stderr_reader, &stderr_capture, "stderr").await;

    log::debug!(
        "'{}' finished as {:?} in {:?} ({} bytes stdout, {} bytes stderr)",
        program,
        termination,
        duration,
        stdout.len(),
        stderr.len()
    );

    Ok(ProcessOutcome {
        termination,
        stdout,
        stderr,
        duration,
    })
}

#[cfg(unix)]
fn termination_from(status: std::process::ExitStatus) -> Termination {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => Termination::Exited(code),
        (None, Some(signal)) => Termination::Signaled(signal),
        (None, None) => Termination::Exited(-1),
    }
}

#[cfg(not(unix))]
fn termination_from(status: std::process::ExitStatus) -> Termination {
    Termination::Exited(status.code().unwrap_or(-1))
}

/// SIGKILL every process in the group led by `leader`.
#[cfg(unix)]
fn kill_group(leader: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = leader {
        match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => log::debug!("killpg({}) failed: {}", pid, e),
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: Option<u32>) {}

/// Kill the child itself, then reap it.
async fn kill_tree(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        log::debug!("start_kill failed: {}", e);
    }
    if tokio::time::timeout(READER_GRACE, child.wait()).await.is_err() {
        log::warn!("Killed process did not exit within {:?}", READER_GRACE);
    }
}

/// Bytes read from one stream so far. Shared with its reader task so that
/// abandoning the reader keeps whatever it already captured.
#[derive(Debug, Clone)]
struct StreamCapture {
    limit: usize,
    inner: Arc<Mutex<Captured>>,
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl StreamCapture {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            inner: Arc::new(Mutex::new(Captured::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, chunk: &[u8]) {
        let mut captured = self.lock();
        let room = self.limit.saturating_sub(captured.bytes.len());
        if chunk.len() > room {
            captured.truncated = true;
        }
        captured.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn text(&self) -> String {
        let captured = self.lock();
        let mut text = String::from_utf8_lossy(&captured.bytes).into_owned();
        if captured.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

async fn collect(reader: JoinHandle<()>, capture: &StreamCapture, stream: &str) -> String {
    let abort = reader.abort_handle();
    match tokio::time::timeout(READER_GRACE, reader).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("{} reader failed: {}", stream, e),
        Err(_) => {
            log::warn!("{} reader still open after process exit; abandoning it", stream);
            abort.abort();
        }
    }
    capture.text()
}

/// Read a stream to the end into `capture`. Bytes past the capture limit are
/// drained so the writer never blocks on a full pipe.
async fn read_capped<R>(mut stream: R, capture: StreamCapture)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];

    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => capture.push(&buf[..n]),
            Err(e) => {
                log::debug!("stream read error: {}", e);
                break;
            }
        }
    }
}
