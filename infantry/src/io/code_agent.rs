//! Code-agent abstraction for mission execution.
//!
//! The [`CodeAgent`] trait decouples the code-modification node from the actual
//! editing backend (currently the `aider` CLI). Tests use scripted agents that
//! edit and commit files directly without spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::io::process::{StreamOptions, run_command_streaming};

/// Flags that keep the agent from prompting or formatting for a TTY.
pub const HEADLESS_FLAGS: &[&str] = &[
    "--yes-always",
    "--no-pretty",
    "--no-stream",
    "--no-fancy-input",
    "--no-check-update",
    "--no-show-release-notes",
    "--no-suggest-shell-commands",
];

/// Parameters for one code-agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInvocation {
    /// Working directory for the agent process (the target repository).
    pub workdir: PathBuf,
    /// Instruction text passed as the positional prompt.
    pub prompt: String,
    pub model: String,
    pub auto_commits: bool,
    /// Agent configuration file, if any.
    pub config_file: Option<PathBuf>,
    /// Files the agent may read but not edit.
    pub read_only_files: Vec<String>,
    /// Files the agent may edit.
    pub editable_files: Vec<String>,
}

/// Exit code and captured output of an agent run.
///
/// An exit code of `-1` means the agent could not be run at all; `stderr` then
/// explains why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRun {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl AgentRun {
    pub fn host_failure(message: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: message.into(),
        }
    }
}

/// Abstraction over code-editing backends.
///
/// Implementations never interpret the exit code; callers decide what a run
/// means.
pub trait CodeAgent {
    fn run(&self, invocation: &AgentInvocation) -> AgentRun;
}

/// Settings for the `aider` subprocess backend.
#[derive(Debug, Clone)]
pub struct AiderAgent {
    pub command: String,
    pub extra_args: Vec<String>,
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl AiderAgent {
    /// Full argument list (without the program name) for `invocation`.
    pub fn build_args(&self, invocation: &AgentInvocation) -> Vec<String> {
        let mut args = vec![
            "--message".to_string(),
            invocation.prompt.clone(),
            "--model".to_string(),
            invocation.model.clone(),
        ];
        args.push(if invocation.auto_commits {
            "--auto-commits".to_string()
        } else {
            "--no-auto-commits".to_string()
        });
        if let Some(config) = &invocation.config_file {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        for path in &invocation.read_only_files {
            args.push("--read".to_string());
            args.push(path.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend(HEADLESS_FLAGS.iter().map(|flag| (*flag).to_string()));
        args.extend(invocation.editable_files.iter().cloned());
        args
    }
}

impl CodeAgent for AiderAgent {
    #[instrument(skip_all, fields(command = %self.command, model = %invocation.model))]
    fn run(&self, invocation: &AgentInvocation) -> AgentRun {
        info!(
            workdir = %invocation.workdir.display(),
            editable = invocation.editable_files.len(),
            read_only = invocation.read_only_files.len(),
            "starting code agent"
        );

        let mut cmd = Command::new(&self.command);
        cmd.args(self.build_args(invocation))
            .current_dir(&invocation.workdir);

        let options = StreamOptions {
            label: "code_agent".to_string(),
            timeout: self.timeout,
            output_limit_bytes: self.output_limit_bytes,
        };
        let output = match run_command_streaming(cmd, &options) {
            Ok(output) => output,
            Err(err) => {
                let not_found = err
                    .chain()
                    .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
                    .any(|io| io.kind() == std::io::ErrorKind::NotFound);
                if not_found {
                    warn!(command = %self.command, "code agent binary not found");
                    return AgentRun::host_failure(format!(
                        "code agent binary '{}' not found",
                        self.command
                    ));
                }
                warn!(err = %format!("{err:#}"), "code agent could not be run");
                return AgentRun::host_failure(format!(
                    "unexpected error running code agent: {err:#}"
                ));
            }
        };

        let mut stderr = output.stderr_lossy();
        if output.timed_out {
            warn!(timeout = ?self.timeout, "code agent timed out");
            stderr.push_str(&format!("\n[code agent timed out after {:?}]\n", self.timeout));
        }
        let exit_code = if output.timed_out {
            -1
        } else {
            output.status.code().unwrap_or(-1)
        };
        info!(exit_code, "code agent finished");

        AgentRun {
            exit_code,
            stdout: output.stdout_lossy(),
            stderr,
        }
    }
}
