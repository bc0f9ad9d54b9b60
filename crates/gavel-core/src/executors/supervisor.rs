//! Execution supervision: stdin delivery, bounded output capture and the
//! wall-clock deadline.
//!
//! The supervised process is raced against the deadline and the caller's
//! cancellation token. Whichever loses is dropped; a process that loses is
//! killed and reaped before `supervise` returns.

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;

use crate::errors::SandboxError;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Exited on its own. `code` is `None` when a signal ended it.
    Completed { code: Option<i32> },
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SupervisedExit {
    pub state: ExitState,
    pub stdout: String,
    pub stderr: String,
    /// Set when either stream went past the output cap.
    pub truncated: bool,
    pub elapsed: Duration,
}

impl SupervisedExit {
    fn interrupted(state: ExitState, elapsed: Duration) -> Self {
        Self {
            state,
            stdout: String::new(),
            stderr: String::new(),
            truncated: false,
            elapsed,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == (ExitState::Completed { code: Some(0) })
    }

    /// Best available explanation of a failed run: stderr, then stdout, then
    /// the exit status.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }

        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }

        match self.state {
            ExitState::Completed { code: Some(code) } => {
                format!("Process exited with status {}", code)
            }
            ExitState::Completed { code: None } => "Process was terminated by a signal".to_string(),
            ExitState::TimedOut => "Process timed out".to_string(),
            ExitState::Cancelled => "Process was cancelled".to_string(),
        }
    }
}

/// Spawn `program args..` with all three standard streams piped.
pub fn spawn(program: &str, args: &[String]) -> Result<Child, SandboxError> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SandboxError::Spawn {
            runtime: program.to_string(),
            source,
        })
}

enum Race {
    Finished(Result<Collected, SandboxError>),
    TimedOut,
    Cancelled,
}

struct Collected {
    code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    truncated: bool,
}

/// Feed `stdin_payload` (then close stdin), capture both streams up to the
/// cap and wait for exit, all bounded by `limits.timeout` and `cancel`.
pub async fn supervise(
    mut child: Child,
    stdin_payload: Option<&[u8]>,
    limits: Limits,
    cancel: &CancellationToken,
) -> Result<SupervisedExit, SandboxError> {
    let started = Instant::now();

    let race = tokio::select! {
        collected = collect(&mut child, stdin_payload, limits.max_output_bytes) => Race::Finished(collected),
        _ = tokio::time::sleep(limits.timeout) => Race::TimedOut,
        _ = cancel.cancelled() => Race::Cancelled,
    };

    match race {
        Race::Finished(Ok(collected)) => Ok(SupervisedExit {
            state: ExitState::Completed {
                code: collected.code,
            },
            stdout: String::from_utf8_lossy(&collected.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&collected.stderr).into_owned(),
            truncated: collected.truncated,
            elapsed: started.elapsed(),
        }),
        Race::Finished(Err(e)) => {
            terminate(&mut child).await;
            Err(e)
        }
        Race::TimedOut => {
            log::debug!("Process exceeded {} ms, killing it", limits.timeout.as_millis());
            terminate(&mut child).await;
            Ok(SupervisedExit::interrupted(ExitState::TimedOut, started.elapsed()))
        }
        Race::Cancelled => {
            log::debug!("Execution cancelled, killing process");
            terminate(&mut child).await;
            Ok(SupervisedExit::interrupted(ExitState::Cancelled, started.elapsed()))
        }
    }
}

async fn collect(
    child: &mut Child,
    stdin_payload: Option<&[u8]>,
    max_output_bytes: usize,
) -> Result<Collected, SandboxError> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (fed, out, err) = tokio::join!(
        feed_stdin(stdin, stdin_payload),
        read_capped(stdout, max_output_bytes),
        read_capped(stderr, max_output_bytes),
    );
    fed?;
    let (stdout, stdout_truncated) = out.map_err(SandboxError::Wait)?;
    let (stderr, stderr_truncated) = err.map_err(SandboxError::Wait)?;

    let status = child.wait().await.map_err(SandboxError::Wait)?;

    Ok(Collected {
        code: status.code(),
        stdout,
        stderr,
        truncated: stdout_truncated || stderr_truncated,
    })
}

async fn feed_stdin(
    stdin: Option<ChildStdin>,
    payload: Option<&[u8]>,
) -> Result<(), SandboxError> {
    let Some(mut pipe) = stdin else {
        return Ok(());
    };

    if let Some(payload) = payload {
        match pipe.write_all(payload).await {
            Ok(()) => {}
            // The program exited or closed stdin without reading everything.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                log::debug!("Sandbox closed stdin early: {}", e);
                return Ok(());
            }
            Err(e) => return Err(SandboxError::Stdin(e)),
        }
    }

    if let Err(e) = pipe.shutdown().await {
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            return Err(SandboxError::Stdin(e));
        }
    }
    Ok(())
}

/// Read a stream to EOF, keeping at most `limit` bytes. The rest is drained
/// so the writer never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    limit: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut kept = Vec::new();
    let mut truncated = false;
    let Some(mut reader) = reader else {
        return Ok((kept, truncated));
    };

    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        if room > 0 {
            kept.extend_from_slice(&chunk[..n.min(room)]);
        }
        if n > room {
            truncated = true;
        }
    }

    Ok((kept, truncated))
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        log::debug!("Failed to kill supervised process: {}", e);
    }
}
