//! Campaign loop: secretary once, then one infantry run per manifest folder.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{error, info, instrument, warn};

use crate::config::GeneralConfig;
use crate::manifest::{read_manifest, to_repo_relative};

/// Starts a component and waits for it.
pub trait ComponentRunner {
    /// Run `argv` to completion and return its exit code.
    fn run(&self, argv: &[String]) -> Result<i32>;
}

/// Child process with inherited stdio. Death by signal reports `-1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ComponentRunner for ProcessRunner {
    fn run(&self, argv: &[String]) -> Result<i32> {
        let Some((program, args)) = argv.split_first() else {
            bail!("empty command line");
        };
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("spawn {program}"))?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionRun {
    /// Repo-relative mission folder.
    pub folder: String,
    pub exit_code: i32,
}

impl MissionRun {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignReport {
    pub missions: Vec<MissionRun>,
    /// Folders never attempted because `stop_on_mission_failure` fired.
    pub not_started: Vec<String>,
}

impl CampaignReport {
    pub fn failed(&self) -> usize {
        self.missions.iter().filter(|m| !m.succeeded()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0 && self.not_started.is_empty()
    }
}

pub struct Campaign<R> {
    config: GeneralConfig,
    repo_root: PathBuf,
    runner: R,
}

impl<R: ComponentRunner> Campaign<R> {
    pub fn new(config: GeneralConfig, repo_root: &Path, runner: R) -> Self {
        Self {
            config,
            repo_root: repo_root.to_path_buf(),
            runner,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.repo_root
            .join(&self.config.ai_goals_directory_name)
            .join(&self.config.new_goal_folders_filename)
    }

    pub fn secretary_argv(&self) -> Vec<String> {
        let mut argv = self.config.secretary_command.clone();
        argv.push("--root-git-path".to_string());
        argv.push(self.repo_root.display().to_string());
        if let Some(path) = &self.config.secretary_config_path {
            argv.push("--config".to_string());
            argv.push(path.display().to_string());
        }
        argv
    }

    pub fn infantry_argv(&self, folder: &str) -> Vec<String> {
        let mut argv = self.config.infantry_command.clone();
        argv.push("--root-git-path".to_string());
        argv.push(self.repo_root.display().to_string());
        argv.push("--mission-folder-path".to_string());
        argv.push(folder.to_string());
        if let Some(path) = &self.config.infantry_config_path {
            argv.push("--config".to_string());
            argv.push(path.display().to_string());
        }
        argv
    }

    /// Run the whole campaign. A failing secretary is an error; failing
    /// missions are recorded in the report.
    #[instrument(skip_all, fields(repo = %self.repo_root.display()))]
    pub fn run(&self) -> Result<CampaignReport> {
        info!("running secretary");
        let code = self.runner.run(&self.secretary_argv())?;
        if code != 0 {
            bail!("secretary exited with code {code}");
        }

        let manifest = self.manifest_path();
        let mut folders = Vec::new();
        for entry in read_manifest(&manifest)? {
            folders.push(to_repo_relative(&self.repo_root, &entry)?);
        }
        info!(missions = folders.len(), manifest = %manifest.display(), "manifest read");

        let mut report = CampaignReport::default();
        let mut pending = folders.into_iter();
        while let Some(folder) = pending.next() {
            info!(mission = %folder, "running infantry");
            let exit_code = self.runner.run(&self.infantry_argv(&folder))?;
            let run = MissionRun { folder, exit_code };
            if run.succeeded() {
                info!(mission = %run.folder, "mission succeeded");
            } else {
                error!(mission = %run.folder, exit_code, "mission failed");
            }
            let stop = !run.succeeded() && self.config.stop_on_mission_failure;
            report.missions.push(run);
            if stop {
                report.not_started = pending.by_ref().collect();
                warn!(skipped = report.not_started.len(), "stopping after failed mission");
                break;
            }
        }

        info!(
            missions = report.missions.len(),
            failed = report.failed(),
            not_started = report.not_started.len(),
            "campaign finished"
        );
        Ok(report)
    }
}
