//! Test-only helpers: scratch repositories and scripted collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use serde_json::json;
use tempfile::TempDir;

use crate::core::branch_name::BranchNamingConfig;
use crate::io::code_agent::{AgentInvocation, AgentRun, CodeAgent};
use crate::io::config::{CodeAgentConfig, InfantryConfig};
use crate::io::git::Git;
use crate::io::llm::{ChatMessage, Completion, LlmClient, LlmConfig, LlmError};
use crate::logging::LoggingConfig;

/// Report template shipped with the crate.
pub const REPORT_TEMPLATE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/mission_report.md.j2"
);

/// Throwaway git repository on branch `main` with one initial commit
/// containing `README.md` and `CONVENTIONS.md`.
pub struct TestRepo {
    _dir: TempDir,
    root: PathBuf,
    git: Git,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo dir")?;
        let root = dir.path().canonicalize().context("canonicalize temp repo")?;
        let setup: [&[&str]; 5] = [
            &["init", "--quiet"],
            &["symbolic-ref", "HEAD", "refs/heads/main"],
            &["config", "user.name", "Test User"],
            &["config", "user.email", "test@example.com"],
            &["config", "commit.gpgsign", "false"],
        ];
        for args in setup {
            git_in(&root, args)?;
        }
        let repo = Self {
            git: Git::new(&root),
            root,
            _dir: dir,
        };
        repo.write_file("README.md", "# Sample project\n")?;
        repo.write_file("CONVENTIONS.md", "- Use snake_case.\n")?;
        repo.git.commit_all("initial commit")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    /// Write `contents` to the repo-relative `rel`, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read_file(&self, rel: &str) -> Result<String> {
        let path = self.root.join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Write and commit files in one step.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> Result<()> {
        for (rel, contents) in files {
            self.write_file(rel, contents)?;
        }
        self.git.commit_all(message)?;
        Ok(())
    }

    /// Local branch names, sorted.
    pub fn branches(&self) -> Result<Vec<String>> {
        let out = git_in(&self.root, &["branch", "--format=%(refname:short)"])?;
        let mut names: Vec<String> = out.lines().map(str::to_string).collect();
        names.sort();
        Ok(names)
    }

    /// Number of commits reachable from `rev`.
    pub fn commit_count(&self, rev: &str) -> Result<usize> {
        let out = git_in(&self.root, &["rev-list", "--count", rev])?;
        out.trim().parse().context("parse commit count")
    }
}

fn git_in(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Config with every required key set and the shipped report template.
pub fn sample_config() -> InfantryConfig {
    InfantryConfig {
        root_git_path: None,
        mission_folder_path: None,
        mission_spec_filename: "spec.md".to_string(),
        mission_report_filename: "mission-report.md".to_string(),
        mission_report_template_filename: REPORT_TEMPLATE.to_string(),
        aider_code_model: "code-model".to_string(),
        aider_summary_model: "summary-model".to_string(),
        mission_title_extraction_model: "title-model".to_string(),
        conventions_file_path: "CONVENTIONS.md".to_string(),
        aider_config_file_path: None,
        branch_naming: BranchNamingConfig::default(),
        llm: LlmConfig::default(),
        code_agent: CodeAgentConfig::default(),
        logging: LoggingConfig::default(),
    }
}

/// Raw `MissionMetadata` JSON as a model would return it.
pub fn metadata_json(
    title: &str,
    branch: &str,
    edit: &[&str],
    read: &[&str],
    create: &[&str],
) -> String {
    json!({
        "mission_title": title,
        "git_branch_name": branch,
        "files_to_edit": edit,
        "files_to_read": read,
        "files_to_create": create,
    })
    .to_string()
}

/// Raw `RunSummary` JSON. `commits` are `(hash, message)` pairs.
pub fn summary_json(changes: &[&str], commits: &[(&str, &str)], errors: &[&str]) -> String {
    let commits: Vec<_> = commits
        .iter()
        .map(|(hash, message)| json!({"hash": hash, "message": message}))
        .collect();
    json!({
        "changes": changes,
        "files_modified": [],
        "files_created": [],
        "errors_reported": errors,
        "commits": commits,
        "cost_usd": null,
        "questions_asked": [],
        "raw_summary": changes.join(" "),
    })
    .to_string()
}

#[derive(Default)]
struct LlmScript {
    responses: VecDeque<Result<String, String>>,
    requests: Vec<(String, Vec<ChatMessage>)>,
}

/// [`LlmClient`] that replays queued raw completions.
///
/// `Err(text)` entries become provider errors. Clones share one queue, so a
/// test can keep a handle after moving the client into a service.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    script: Rc<RefCell<LlmScript>>,
    cost_usd: f64,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            script: Rc::new(RefCell::new(LlmScript {
                responses: responses.into(),
                requests: Vec::new(),
            })),
            cost_usd: 0.0,
        }
    }

    /// Cost reported with every completion.
    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = cost_usd;
        self
    }

    /// `(model, messages)` for every call made so far.
    pub fn requests(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.script.borrow().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.borrow().responses.len()
    }
}

impl LlmClient for ScriptedLlm {
    fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let mut script = self.script.borrow_mut();
        script.requests.push((model.to_string(), messages.to_vec()));
        match script.responses.pop_front() {
            Some(Ok(content)) => Ok(Completion {
                content,
                cost_usd: self.cost_usd,
            }),
            Some(Err(body)) => Err(LlmError::Status { status: 500, body }),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

/// One scripted code-agent run.
#[derive(Debug, Clone)]
pub struct AgentStep {
    /// Repo-relative files written before the (optional) commit.
    pub edits: Vec<(String, String)>,
    pub commit_message: Option<String>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl AgentStep {
    /// Edit `files`, commit them with `message`, exit 0.
    pub fn commit(files: &[(&str, &str)], message: &str) -> Self {
        Self {
            edits: files
                .iter()
                .map(|(rel, contents)| ((*rel).to_string(), (*contents).to_string()))
                .collect(),
            commit_message: Some(message.to_string()),
            exit_code: 0,
            stdout: format!("Commit {message}\n"),
            stderr: String::new(),
        }
    }

    /// Touch nothing and exit with `exit_code`.
    pub fn exit(exit_code: i32, stderr: &str) -> Self {
        Self {
            edits: Vec::new(),
            commit_message: None,
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

#[derive(Default)]
struct AgentScript {
    steps: VecDeque<AgentStep>,
    invocations: Vec<AgentInvocation>,
}

/// [`CodeAgent`] that applies scripted edits in the invocation's workdir and
/// commits them like an auto-committing agent would. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedAgent {
    script: Rc<RefCell<AgentScript>>,
}

impl ScriptedAgent {
    pub fn new(steps: Vec<AgentStep>) -> Self {
        Self {
            script: Rc::new(RefCell::new(AgentScript {
                steps: steps.into(),
                invocations: Vec::new(),
            })),
        }
    }

    pub fn invocations(&self) -> Vec<AgentInvocation> {
        self.script.borrow().invocations.clone()
    }
}

impl CodeAgent for ScriptedAgent {
    fn run(&self, invocation: &AgentInvocation) -> AgentRun {
        let step = {
            let mut script = self.script.borrow_mut();
            script.invocations.push(invocation.clone());
            script.steps.pop_front()
        };
        let Some(step) = step else {
            return AgentRun::host_failure("no scripted agent run left");
        };

        for (rel, contents) in &step.edits {
            let path = invocation.workdir.join(rel);
            let written = match path.parent() {
                Some(parent) => fs::create_dir_all(parent),
                None => Ok(()),
            }
            .and_then(|()| fs::write(&path, contents));
            if let Err(err) = written {
                return AgentRun::host_failure(format!("scripted edit failed: {err}"));
            }
        }
        if let Some(message) = &step.commit_message {
            let git = Git::new(&invocation.workdir);
            let files: Vec<&str> = step.edits.iter().map(|(rel, _)| rel.as_str()).collect();
            let committed = git
                .add_paths(&files)
                .and_then(|()| git.commit_staged(message));
            if let Err(err) = committed {
                return AgentRun::host_failure(format!("scripted commit failed: {err}"));
            }
        }

        AgentRun {
            exit_code: step.exit_code,
            stdout: step.stdout,
            stderr: step.stderr,
        }
    }
}
