//! One mission: resolved settings plus the services the nodes call.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::core::branch_name::BranchNamingConfig;
use crate::core::invariants::validate_mission_invariants;
use crate::core::paths::normalize_repo_relative;
use crate::core::types::WorkflowState;
use crate::error::MissionError;
use crate::io::code_agent::CodeAgent;
use crate::io::config::InfantryConfig;
use crate::io::git::Git;
use crate::io::llm::{LlmClient, PromptService};
use crate::io::prompt::PromptEngine;
use crate::workflow::run_workflow;

/// Paths and per-call-site settings resolved for a single mission folder.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionSettings {
    /// Canonical repository root.
    pub repo_root: PathBuf,
    /// Mission folder, repo-relative with `/` separators.
    pub mission_folder: String,
    pub spec_rel: String,
    pub spec_path: PathBuf,
    pub report_path: PathBuf,
    pub report_template: PathBuf,
    pub conventions_rel: String,
    pub aider_config: Option<PathBuf>,
    pub code_model: String,
    pub summary_model: String,
    pub title_model: String,
    pub branch_naming: BranchNamingConfig,
}

impl MissionSettings {
    /// Resolve `cfg` for `mission_folder` inside `repo_root`.
    ///
    /// Relative template paths resolve against `config_dir`; the conventions
    /// and agent config files resolve against the repository.
    pub fn from_config(
        cfg: &InfantryConfig,
        repo_root: &Path,
        mission_folder: &str,
        config_dir: &Path,
    ) -> Result<Self> {
        let Some(folder) = normalize_repo_relative(mission_folder) else {
            bail!(MissionError::PathOutsideRepo(mission_folder.to_string()));
        };
        let Some(conventions_rel) = normalize_repo_relative(&cfg.conventions_file_path) else {
            bail!(MissionError::PathOutsideRepo(cfg.conventions_file_path.clone()));
        };

        let spec_rel = format!("{folder}/{}", cfg.mission_spec_filename);
        let report_rel = format!("{folder}/{}", cfg.mission_report_filename);

        let template = PathBuf::from(&cfg.mission_report_template_filename);
        let report_template = if template.is_absolute() {
            template
        } else {
            config_dir.join(template)
        };

        let aider_config = cfg.aider_config_file_path.as_ref().map(|raw| {
            let path = PathBuf::from(raw);
            if path.is_absolute() {
                path
            } else {
                repo_root.join(path)
            }
        });

        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            spec_path: repo_root.join(&spec_rel),
            report_path: repo_root.join(report_rel),
            mission_folder: folder,
            spec_rel,
            report_template,
            conventions_rel,
            aider_config,
            code_model: cfg.aider_code_model.clone(),
            summary_model: cfg.aider_summary_model.clone(),
            title_model: cfg.mission_title_extraction_model.clone(),
            branch_naming: cfg.branch_naming.clone(),
        })
    }
}

/// Everything a workflow run needs. Nodes borrow it; only the
/// [`WorkflowState`] is mutated.
pub struct Mission<L, A> {
    pub settings: MissionSettings,
    pub git: Git,
    pub agent: A,
    pub llm: PromptService<L>,
    pub prompts: PromptEngine,
}

impl<L: LlmClient, A: CodeAgent> Mission<L, A> {
    pub fn new(settings: MissionSettings, llm: L, agent: A) -> Result<Self> {
        Ok(Self {
            git: Git::new(&settings.repo_root),
            settings,
            agent,
            llm: PromptService::new(llm),
            prompts: PromptEngine::new()?,
        })
    }

    /// Run the mission workflow to completion.
    pub fn run(&self) -> WorkflowState {
        info!(
            mission = %self.settings.mission_folder,
            repo = %self.settings.repo_root.display(),
            "mission started"
        );
        let state = run_workflow(self);
        for violation in validate_mission_invariants(&state) {
            warn!(%violation, "mission invariant violated");
        }
        let ctx = &state.mission_context;
        info!(
            status = ctx.status.map_or("NOT STARTED", |s| s.as_str()),
            branch = %ctx.generated_branch_name,
            cost_usd = ctx.total_cost_usd,
            "mission finished"
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_config;

    #[test]
    fn resolves_paths_against_repo_and_config_dir() {
        let mut cfg = sample_config();
        cfg.mission_report_template_filename = "templates/report.md.j2".to_string();
        cfg.aider_config_file_path = Some(".aider.conf.yml".to_string());

        let settings = MissionSettings::from_config(
            &cfg,
            Path::new("/repo"),
            "./ai-goals/add-widget/",
            Path::new("/etc/army"),
        )
        .expect("settings");

        assert_eq!(settings.mission_folder, "ai-goals/add-widget");
        assert_eq!(settings.spec_rel, "ai-goals/add-widget/spec.md");
        assert_eq!(settings.spec_path, PathBuf::from("/repo/ai-goals/add-widget/spec.md"));
        assert_eq!(
            settings.report_path,
            PathBuf::from("/repo/ai-goals/add-widget/mission-report.md")
        );
        assert_eq!(
            settings.report_template,
            PathBuf::from("/etc/army/templates/report.md.j2")
        );
        assert_eq!(settings.aider_config, Some(PathBuf::from("/repo/.aider.conf.yml")));
        assert_eq!(settings.conventions_rel, "CONVENTIONS.md");
    }

    #[test]
    fn mission_folder_must_stay_inside_repo() {
        let cfg = sample_config();
        for bad in ["/abs/mission", "../elsewhere", ""] {
            let err = MissionSettings::from_config(&cfg, Path::new("/repo"), bad, Path::new("."))
                .unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<MissionError>(),
                    Some(MissionError::PathOutsideRepo(_))
                ),
                "{bad}"
            );
        }
    }
}
