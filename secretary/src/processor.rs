//! Backlog fan-out: one mission folder per accepted task section.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use infantry::core::records::StructuredOutput;
use infantry::io::files::{read_optional, write_atomic};
use infantry::io::git::Git;
use infantry::io::llm::{ChatMessage, LlmClient, PromptService};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::backlog::{SkippedSection, TaskSection, parse_backlog};
use crate::config::SecretaryConfig;
use crate::folder_name::{fallback_folder_name, sanitize_folder_name};

const FOLDER_NAME_SCHEMA: &str = include_str!("../schemas/folder_name.schema.json");
const FOLDER_NAME_PROMPT: &str = include_str!("prompts/folder_name.md");

/// Folder name proposed by the model for one task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FolderName {
    pub folder_name: String,
}

impl StructuredOutput for FolderName {
    const NAME: &'static str = "folder_name";
    const SCHEMA: &'static str = FOLDER_NAME_SCHEMA;
}

/// Resolved paths and knobs for one run.
#[derive(Debug, Clone)]
pub struct SecretarySettings {
    pub repo_root: PathBuf,
    /// Goals directory, repo-relative.
    pub goals_rel: String,
    pub goals_dir: PathBuf,
    pub backlog_path: PathBuf,
    pub manifest_path: PathBuf,
    pub spec_filename: String,
    pub model: String,
    pub placeholder_title: String,
    pub commit_message: String,
}

impl SecretarySettings {
    pub fn from_config(cfg: &SecretaryConfig, repo_root: &Path) -> Result<Self> {
        let goals_rel = cfg.goals_dir_rel()?;
        let goals_dir = repo_root.join(&goals_rel);
        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            backlog_path: goals_dir.join(&cfg.backlog_file_name),
            manifest_path: goals_dir.join(&cfg.new_goal_folders_filename),
            goals_dir,
            goals_rel,
            spec_filename: cfg.mission_spec_filename.clone(),
            model: cfg.default_llm_model_name.clone(),
            placeholder_title: cfg.placeholder_task_title.clone(),
            commit_message: cfg.commit_message.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub title: String,
    pub error: String,
}

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Absolute mission folders, in backlog order. Also the manifest content.
    pub created: Vec<PathBuf>,
    pub skipped: Vec<SkippedSection>,
    pub failed: Vec<TaskFailure>,
    pub backlog_deleted: bool,
    pub committed: bool,
}

pub struct Secretary<L> {
    settings: SecretarySettings,
    git: Git,
    llm: PromptService<L>,
}

impl<L: LlmClient> Secretary<L> {
    pub fn new(settings: SecretarySettings, llm: L) -> Self {
        Self {
            git: Git::new(&settings.repo_root),
            llm: PromptService::new(llm),
            settings,
        }
    }

    pub fn settings(&self) -> &SecretarySettings {
        &self.settings
    }

    /// Split the backlog into mission folders, write the manifest and commit.
    ///
    /// Per-task failures are recorded in the outcome; only filesystem or git
    /// errors around the whole run are returned as `Err`.
    #[instrument(skip_all, fields(backlog = %self.settings.backlog_path.display()))]
    pub fn process(&self) -> Result<Outcome> {
        let settings = &self.settings;
        let mut outcome = Outcome::default();

        match read_optional(&settings.backlog_path)? {
            None => info!("no backlog file, nothing to do"),
            Some(contents) => {
                let parsed = parse_backlog(&contents, &settings.placeholder_title);
                for skip in &parsed.skipped {
                    warn!(
                        line = skip.line,
                        title = skip.title.as_deref().unwrap_or(""),
                        reason = %skip.reason,
                        "skipping backlog section"
                    );
                }
                outcome.skipped = parsed.skipped;

                let mut used = HashSet::new();
                for task in &parsed.tasks {
                    match self.create_mission(task, &mut used) {
                        Ok(folder) => outcome.created.push(folder),
                        Err(err) => {
                            error!(title = %task.title, err = %format!("{err:#}"), "task failed");
                            outcome.failed.push(TaskFailure {
                                title: task.title.clone(),
                                error: format!("{err:#}"),
                            });
                        }
                    }
                }

                if !outcome.created.is_empty() || contents.trim().is_empty() {
                    fs::remove_file(&settings.backlog_path).with_context(|| {
                        format!("delete backlog {}", settings.backlog_path.display())
                    })?;
                    outcome.backlog_deleted = true;
                    info!("backlog deleted");
                } else {
                    warn!("no task was processed, keeping the backlog");
                }
            }
        }

        write_atomic(&settings.manifest_path, &manifest_contents(&outcome.created))?;
        let staged = self.paths_to_stage(&outcome)?;
        let staged: Vec<&str> = staged.iter().map(String::as_str).collect();
        self.git.add_paths(&staged)?;
        outcome.committed = self.git.commit_staged(&settings.commit_message)?;

        info!(
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failed.len(),
            backlog_deleted = outcome.backlog_deleted,
            committed = outcome.committed,
            manifest = %settings.manifest_path.display(),
            "secretary run finished"
        );
        Ok(outcome)
    }

    /// Repo-relative paths this run wrote or deleted. Other files under the
    /// goals directory, such as mission reports, stay out of the commit.
    fn paths_to_stage(&self, outcome: &Outcome) -> Result<Vec<String>> {
        let settings = &self.settings;
        let mut paths = vec![self.repo_relative(&settings.manifest_path)?];
        for folder in &outcome.created {
            paths.push(self.repo_relative(&folder.join(&settings.spec_filename))?);
        }
        if outcome.backlog_deleted {
            let backlog = self.repo_relative(&settings.backlog_path)?;
            if self.git.is_tracked(&backlog)? {
                paths.push(backlog);
            }
        }
        Ok(paths)
    }

    fn repo_relative(&self, path: &Path) -> Result<String> {
        let rel = path
            .strip_prefix(&self.settings.repo_root)
            .with_context(|| format!("{} is outside the repository", path.display()))?;
        Ok(rel.to_string_lossy().into_owned())
    }

    #[instrument(skip_all, fields(title = %task.title))]
    fn create_mission(&self, task: &TaskSection, used: &mut HashSet<String>) -> Result<PathBuf> {
        let name = self.folder_name(task, used);
        let folder = self.settings.goals_dir.join(&name);
        if folder.is_dir() {
            warn!(folder = %folder.display(), "mission folder already exists, reusing it");
        }
        fs::create_dir_all(&folder)
            .with_context(|| format!("create mission folder {}", folder.display()))?;
        let spec_path = folder.join(&self.settings.spec_filename);
        write_atomic(&spec_path, &format!("{}\n", task.description))?;
        info!(folder = %folder.display(), "mission folder created");
        Ok(folder)
    }

    /// Model-proposed name, or the timestamped fallback. Unique within `used`.
    fn folder_name(&self, task: &TaskSection, used: &mut HashSet<String>) -> String {
        let messages = [
            ChatMessage::system(FOLDER_NAME_PROMPT),
            ChatMessage::user(format!("Title: {}\n\n{}", task.title, task.description)),
        ];
        let proposed = self
            .llm
            .extract::<FolderName>(&messages, &self.settings.model)
            .map(|extraction| sanitize_folder_name(&extraction.record.folder_name))
            .filter(|name| !name.is_empty());

        let name = match proposed {
            Some(name) if !used.contains(&name) => name,
            Some(name) => {
                warn!(folder = %name, "folder name already used in this run, falling back");
                unique_fallback(&task.title, used)
            }
            None => {
                warn!("no usable folder name from the model, falling back");
                unique_fallback(&task.title, used)
            }
        };
        used.insert(name.clone());
        name
    }
}

fn unique_fallback(title: &str, used: &HashSet<String>) -> String {
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let name = fallback_folder_name(title, millis);
        if !used.contains(&name) {
            return name;
        }
        millis += 1;
    }
}

/// One absolute path per line with a trailing newline; empty when nothing was created.
pub fn manifest_contents(folders: &[PathBuf]) -> String {
    folders
        .iter()
        .map(|folder| format!("{}\n", folder.display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use infantry::test_support::{ScriptedLlm, TestRepo};
    use serde_json::json;

    const BACKLOG: &str = concat!(
        "## Task Title\nDescribe the task here.\n\n",
        "## Add widget\nAdd the foo widget.\n\n",
        "## Fix login\nLogin fails on empty password.\n",
    );

    fn config() -> SecretaryConfig {
        serde_yaml::from_str("default_llm_model_name: folder-model\n").expect("config")
    }

    fn name(folder: &str) -> Result<String, String> {
        Ok(json!({ "folder_name": folder }).to_string())
    }

    fn secretary(repo: &TestRepo, llm: ScriptedLlm) -> Secretary<ScriptedLlm> {
        let settings = SecretarySettings::from_config(&config(), repo.path()).expect("settings");
        Secretary::new(settings, llm)
    }

    #[test]
    fn fans_out_backlog_into_mission_folders() {
        let repo = TestRepo::new().expect("repo");
        repo.commit_files(&[("ai-goals/backlog.md", BACKLOG)], "add backlog")
            .expect("commit backlog");
        let llm = ScriptedLlm::new(vec![name("Add Widget"), name("fix-login")]);
        let before = repo.commit_count("HEAD").expect("count");

        let outcome = secretary(&repo, llm.clone()).process().expect("process");

        let goals = repo.path().join("ai-goals");
        assert_eq!(outcome.created, vec![goals.join("add-widget"), goals.join("fix-login")]);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.failed.is_empty());
        assert!(outcome.backlog_deleted);
        assert!(outcome.committed);

        assert_eq!(
            repo.read_file("ai-goals/add-widget/spec.md").expect("spec"),
            "Add the foo widget.\n"
        );
        assert_eq!(
            repo.read_file("ai-goals/fix-login/spec.md").expect("spec"),
            "Login fails on empty password.\n"
        );
        assert!(!goals.join("backlog.md").exists());
        assert_eq!(
            repo.read_file("ai-goals/new-goal-folders.txt").expect("manifest"),
            format!(
                "{}\n{}\n",
                goals.join("add-widget").display(),
                goals.join("fix-login").display()
            )
        );
        assert_eq!(repo.commit_count("HEAD").expect("count"), before + 1);
        assert!(repo.git().status_porcelain().expect("status").is_empty());
        assert_eq!(
            repo.git().last_commit_summary().expect("summary"),
            "chore(secretary): add missions from backlog"
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, "folder-model");
        let user = &requests[0].1.last().expect("user message").content;
        assert!(user.contains("Title: Add widget"), "{user}");
        assert!(user.contains("Add the foo widget."), "{user}");
    }

    #[test]
    fn falls_back_when_model_fails_or_repeats_a_name() {
        let repo = TestRepo::new().expect("repo");
        repo.commit_files(&[("ai-goals/backlog.md", BACKLOG)], "add backlog")
            .expect("commit backlog");
        let llm = ScriptedLlm::new(vec![name("same"), name("same")]);
        let outcome = secretary(&repo, llm).process().expect("process");
        let names: Vec<String> = outcome
            .created
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(names[0], "same");
        assert!(names[1].starts_with("fix-login-"), "{}", names[1]);

        let repo = TestRepo::new().expect("repo");
        repo.commit_files(&[("ai-goals/backlog.md", BACKLOG)], "add backlog")
            .expect("commit backlog");
        let llm = ScriptedLlm::new(vec![Err("boom".to_string()), name("!!!")]);
        let outcome = secretary(&repo, llm).process().expect("process");
        assert_eq!(outcome.created.len(), 2);
        for (folder, prefix) in outcome.created.iter().zip(["add-widget-", "fix-login-"]) {
            let folder_name = folder.file_name().expect("name").to_string_lossy().into_owned();
            let millis = folder_name.strip_prefix(prefix).expect("fallback prefix");
            assert!(millis.parse::<i64>().is_ok(), "{folder_name}");
            assert!(folder.join("spec.md").is_file());
        }
    }

    #[test]
    fn keeps_backlog_without_any_task() {
        let repo = TestRepo::new().expect("repo");
        let backlog = "Notes without headers\n## Task Title\nTemplate.\n";
        repo.commit_files(&[("ai-goals/backlog.md", backlog)], "add backlog")
            .expect("commit backlog");
        let llm = ScriptedLlm::new(Vec::new());

        let outcome = secretary(&repo, llm.clone()).process().expect("process");

        assert!(outcome.created.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
        assert!(!outcome.backlog_deleted);
        assert_eq!(repo.read_file("ai-goals/backlog.md").expect("backlog"), backlog);
        assert_eq!(repo.read_file("ai-goals/new-goal-folders.txt").expect("manifest"), "");
        assert!(llm.requests().is_empty());
    }

    #[test]
    fn deletes_whitespace_only_backlog() {
        let repo = TestRepo::new().expect("repo");
        repo.commit_files(&[("ai-goals/backlog.md", "\n  \n")], "add backlog")
            .expect("commit backlog");

        let outcome = secretary(&repo, ScriptedLlm::new(Vec::new()))
            .process()
            .expect("process");

        assert!(outcome.backlog_deleted);
        assert!(outcome.committed);
        assert!(!repo.path().join("ai-goals/backlog.md").exists());
    }

    #[test]
    fn missing_backlog_writes_empty_manifest() {
        let repo = TestRepo::new().expect("repo");

        let outcome = secretary(&repo, ScriptedLlm::new(Vec::new()))
            .process()
            .expect("process");

        assert_eq!(outcome, Outcome { committed: true, ..Outcome::default() });
        assert_eq!(repo.read_file("ai-goals/new-goal-folders.txt").expect("manifest"), "");
    }

    #[test]
    fn existing_folder_is_reused() {
        let repo = TestRepo::new().expect("repo");
        repo.commit_files(
            &[
                ("ai-goals/backlog.md", "## Add widget\nNew text.\n"),
                ("ai-goals/add-widget/notes.md", "old notes\n"),
            ],
            "seed",
        )
        .expect("seed");

        let outcome = secretary(&repo, ScriptedLlm::new(vec![name("add-widget")]))
            .process()
            .expect("process");

        assert_eq!(outcome.created.len(), 1);
        assert_eq!(repo.read_file("ai-goals/add-widget/spec.md").expect("spec"), "New text.\n");
        assert_eq!(repo.read_file("ai-goals/add-widget/notes.md").expect("notes"), "old notes\n");
    }

    #[test]
    fn commit_leaves_mission_reports_untracked() {
        let repo = TestRepo::new().expect("repo");
        repo.commit_files(&[("ai-goals/old-task/spec.md", "Old task.\n")], "old mission")
            .expect("seed");
        repo.write_file("ai-goals/old-task/mission-report.md", "# Report\n")
            .expect("report");
        repo.write_file("ai-goals/backlog.md", "## Add widget\nAdd it.\n")
            .expect("untracked backlog");

        let outcome = secretary(&repo, ScriptedLlm::new(vec![name("add-widget")]))
            .process()
            .expect("process");

        assert!(outcome.committed);
        assert!(outcome.backlog_deleted);
        assert!(repo.git().is_tracked("ai-goals/add-widget/spec.md").expect("spec"));
        assert!(repo.git().is_tracked("ai-goals/new-goal-folders.txt").expect("manifest"));
        assert!(
            !repo
                .git()
                .is_tracked("ai-goals/old-task/mission-report.md")
                .expect("report")
        );
        let status = repo.git().status_porcelain().expect("status");
        let paths: Vec<&str> = status.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["ai-goals/old-task/mission-report.md"]);
    }

    #[test]
    fn manifest_format() {
        assert_eq!(manifest_contents(&[]), "");
        assert_eq!(
            manifest_contents(&[PathBuf::from("/r/ai-goals/a"), PathBuf::from("/r/ai-goals/b")]),
            "/r/ai-goals/a\n/r/ai-goals/b\n"
        );
    }
}
