//! Child-process runner that drains stdout and stderr concurrently.
//!
//! Each pipe gets its own reader thread which logs every line as it arrives and
//! keeps a bounded copy in memory. Both readers reach EOF before the child is
//! reaped, so a chatty child can never block on a full pipe.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stdout).into_owned();
        out.push_str(&truncated_notice("stdout", self.stdout_truncated));
        out
    }

    pub fn stderr_lossy(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stderr).into_owned();
        out.push_str(&truncated_notice("stderr", self.stderr_truncated));
        out
    }
}

fn truncated_notice(stream: &str, bytes: usize) -> String {
    if bytes > 0 {
        format!("\n[{stream} truncated {bytes} bytes]\n")
    } else {
        String::new()
    }
}

/// How to run and observe a streamed child process.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Name attached to every logged line (e.g. `code_agent`).
    pub label: String,
    /// Kill the child after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Bytes of each stream kept in memory; the rest is drained and counted.
    pub output_limit_bytes: usize,
}

/// Run `cmd` with stdin closed, streaming both output pipes line by line.
#[instrument(skip_all, fields(label = %options.label, timeout = ?options.timeout))]
pub fn run_command_streaming(mut cmd: Command, options: &StreamOptions) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let limit = options.output_limit_bytes;
    let stdout_label = options.label.clone();
    let stderr_label = options.label.clone();
    let stdout_handle =
        thread::spawn(move || drain_lines(stdout, &stdout_label, "stdout", limit));
    let stderr_handle =
        thread::spawn(move || drain_lines(stderr, &stderr_label, "stderr", limit));

    let (early_status, timed_out) = match options.timeout {
        Some(timeout) => wait_with_deadline(&mut child, timeout)?,
        None => (None, false),
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    let status = match early_status {
        Some(status) => status,
        None => child.wait().context("wait for command")?,
    };

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<(Option<ExitStatus>, bool)> {
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((Some(status), false)),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            let status = child.wait().context("wait command after kill")?;
            Ok((Some(status), true))
        }
    }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn drain_lines<R: Read>(
    reader: R,
    label: &str,
    stream: &'static str,
    limit: usize,
) -> Result<(Vec<u8>, usize)> {
    let mut buf_reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut truncated = 0usize;

    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        let text = String::from_utf8_lossy(&line);
        info!(label, stream, "{}", text.trim_end());

        let remaining = limit.saturating_sub(collected.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            collected.extend_from_slice(&line[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((collected, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(timeout: Option<Duration>, limit: usize) -> StreamOptions {
        StreamOptions {
            label: "test".to_string(),
            timeout,
            output_limit_bytes: limit,
        }
    }

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_both_streams_and_exit_code() {
        let out = run_command_streaming(sh("echo out; echo err >&2; exit 3"), &options(None, 1024))
            .expect("run");
        assert_eq!(out.status.code(), Some(3));
        assert_eq!(out.stdout_lossy(), "out\n");
        assert_eq!(out.stderr_lossy(), "err\n");
        assert!(!out.timed_out);
    }

    #[test]
    fn large_output_on_both_pipes_does_not_deadlock() {
        // Well past the usual 64 KiB pipe buffer on each stream.
        let script = "i=0; while [ $i -lt 4000 ]; do \
                      echo 'stdout line with some padding to fill the pipe'; \
                      echo 'stderr line with some padding to fill the pipe' >&2; \
                      i=$((i+1)); done";
        let out = run_command_streaming(sh(script), &options(None, 10_000)).expect("run");
        assert!(out.status.success());
        assert_eq!(out.stdout.len(), 10_000);
        assert!(out.stdout_truncated > 0);
        assert!(out.stderr_lossy().contains("[stderr truncated"));
    }

    #[test]
    fn deadline_kills_slow_child() {
        let out = run_command_streaming(
            sh("exec sleep 5"),
            &options(Some(Duration::from_millis(200)), 1024),
        )
        .expect("run");
        assert!(out.timed_out);
        assert!(!out.status.success());
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let err = run_command_streaming(
            Command::new("definitely-not-a-real-binary-xyz"),
            &options(None, 1024),
        )
        .unwrap_err();
        assert!(err.to_string().contains("spawn command"));
    }
}
