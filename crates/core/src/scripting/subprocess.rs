//! Shared subprocess governance.
//!
//! Provides [`run_command`], which spawns a prepared
//! [`tokio::process::Command`], feeds it stdin, drains and caps both output
//! streams, and enforces a wall-clock deadline. The child is placed in its
//! own process group so the whole tree can be killed at once.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Read buffer size used while draining output streams.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How long output pipes may stay open after the child exits before the
/// remaining process group is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Captured output from a process that exited before its deadline.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Stdout, capped at the configured byte limit.
    pub stdout: String,
    /// Stderr, capped at the configured byte limit.
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// How a governed process finished.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The process exited on its own.
    Exited(ProcessOutput),
    /// The deadline fired and the process group was killed.
    TimedOut {
        /// Elapsed wall-clock time before the kill.
        elapsed_ms: u64,
    },
}

/// Spawn `cmd`, write `stdin` to it, and wait at most `timeout`.
///
/// Both output streams are read to EOF so a verbose child never blocks on a
/// full pipe, but only the first `output_cap` bytes of each are kept. Once
/// the child times out, or exits while descendants still hold its output
/// pipes, the rest of its process group is killed.
pub async fn run_command(
    cmd: &mut Command,
    stdin: Vec<u8>,
    timeout: Duration,
    output_cap: usize,
) -> std::io::Result<ProcessOutcome> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let start = Instant::now();

    let mut child = cmd.spawn()?;
    let pid = child.id();

    // Stdin is written from its own task so a child that produces output
    // before consuming its input cannot deadlock against us.
    let stdin_task = child.stdin.take().map(|mut pipe| {
        tokio::spawn(async move {
            // The process may exit without reading its input.
            let _ = pipe.write_all(&stdin).await;
            let _ = pipe.shutdown().await;
        })
    });

    let mut stdout_task = tokio::spawn(read_capped(child.stdout.take(), output_cap));
    let mut stderr_task = tokio::spawn(read_capped(child.stderr.take(), output_cap));

    let wait_result = tokio::time::timeout(timeout, child.wait()).await;

    match wait_result {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            // The leader is already reaped, so its pid is only safe to
            // signal as a group while a descendant keeps the group alive. A
            // pipe still open after the grace period proves one does.
            let grace = tokio::time::Instant::now() + DRAIN_GRACE;
            let mut group_killed = false;
            let stdout_bytes = match join_before(&mut stdout_task, grace).await {
                Some(bytes) => bytes,
                None => {
                    kill_process_group(pid);
                    group_killed = true;
                    stdout_task.await.unwrap_or_default()
                }
            };
            let stderr_bytes = match join_before(&mut stderr_task, grace).await {
                Some(bytes) => bytes,
                None => {
                    if !group_killed {
                        kill_process_group(pid);
                    }
                    stderr_task.await.unwrap_or_default()
                }
            };
            if let Some(task) = stdin_task {
                task.abort();
            }

            Ok(ProcessOutcome::Exited(ProcessOutput {
                stdout: decode_capped(&stdout_bytes, output_cap),
                stderr: decode_capped(&stderr_bytes, output_cap),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            }))
        }
        Ok(Err(e)) => {
            let _ = child.start_kill();
            abort_all(stdin_task, stdout_task, stderr_task);
            Err(e)
        }
        Err(_elapsed) => {
            kill_process_group(pid);
            let _ = child.kill().await;
            abort_all(stdin_task, stdout_task, stderr_task);
            Ok(ProcessOutcome::TimedOut {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Output of a reader task, or `None` if it is still running at `deadline`.
async fn join_before(
    task: &mut JoinHandle<Vec<u8>>,
    deadline: tokio::time::Instant,
) -> Option<Vec<u8>> {
    tokio::time::timeout_at(deadline, task)
        .await
        .ok()
        .map(Result::unwrap_or_default)
}

fn abort_all(
    stdin_task: Option<JoinHandle<()>>,
    stdout_task: JoinHandle<Vec<u8>>,
    stderr_task: JoinHandle<Vec<u8>>,
) {
    if let Some(task) = stdin_task {
        task.abort();
    }
    stdout_task.abort();
    stderr_task.abort();
}

/// Send SIGKILL to every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|p| libc::pid_t::try_from(p).ok()) else {
        return;
    };
    // SAFETY: killpg only takes integer arguments; an empty group yields ESRCH.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Read a stream to EOF, keeping at most `cap` bytes.
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>, cap: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let Some(mut handle) = handle else {
        return kept;
    };
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match handle.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = cap.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    kept
}

/// Decode captured bytes as UTF-8, never exceeding `cap` bytes.
///
/// A multi-byte character split by the cap is dropped rather than replaced.
pub fn decode_capped(bytes: &[u8], cap: usize) -> String {
    let bytes = &bytes[..bytes.len().min(cap)];
    let bytes = &bytes[..bytes.len() - incomplete_suffix_len(bytes)];
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if text.len() > cap {
        let mut end = cap;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

/// Length of a trailing UTF-8 sequence that was cut short.
fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
