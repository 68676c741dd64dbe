use std::path::PathBuf;

use anyhow::{Result, bail};
use infantry::core::paths::normalize_repo_relative;
use infantry::io::config::{ValidateConfig, require_non_empty};
use infantry::io::llm::LlmConfig;
use infantry::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

fn default_backlog_file_name() -> String {
    "backlog.md".to_string()
}

fn default_ai_goals_directory_name() -> String {
    "ai-goals".to_string()
}

fn default_new_goal_folders_filename() -> String {
    "new-goal-folders.txt".to_string()
}

fn default_mission_spec_filename() -> String {
    "spec.md".to_string()
}

fn default_placeholder_task_title() -> String {
    "Task Title".to_string()
}

fn default_commit_message() -> String {
    "chore(secretary): add missions from backlog".to_string()
}

/// Secretary configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretaryConfig {
    #[serde(default)]
    pub root_git_path: Option<PathBuf>,
    /// Backlog file name inside the goals directory.
    #[serde(default = "default_backlog_file_name")]
    pub backlog_file_name: String,
    /// Repo-relative directory holding the backlog and the mission folders.
    #[serde(default = "default_ai_goals_directory_name")]
    pub ai_goals_directory_name: String,
    #[serde(default = "default_new_goal_folders_filename")]
    pub new_goal_folders_filename: String,
    #[serde(default = "default_mission_spec_filename")]
    pub mission_spec_filename: String,
    /// Model used to name mission folders.
    pub default_llm_model_name: String,
    /// Sections with exactly this title are template leftovers and skipped.
    #[serde(default = "default_placeholder_task_title")]
    pub placeholder_task_title: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(flatten)]
    pub logging: LoggingConfig,
}

impl SecretaryConfig {
    /// `ai_goals_directory_name` in normalized repo-relative form.
    pub fn goals_dir_rel(&self) -> Result<String> {
        match normalize_repo_relative(&self.ai_goals_directory_name) {
            Some(rel) => Ok(rel),
            None => bail!(
                "ai_goals_directory_name '{}' must be a path inside the repository",
                self.ai_goals_directory_name
            ),
        }
    }
}

impl ValidateConfig for SecretaryConfig {
    fn validate(&self) -> Result<()> {
        require_non_empty("backlog_file_name", &self.backlog_file_name)?;
        require_non_empty("new_goal_folders_filename", &self.new_goal_folders_filename)?;
        require_non_empty("mission_spec_filename", &self.mission_spec_filename)?;
        require_non_empty("default_llm_model_name", &self.default_llm_model_name)?;
        require_non_empty("commit_message", &self.commit_message)?;
        require_non_empty("llm.api_base_url", &self.llm.api_base_url)?;
        require_non_empty("llm.api_key_env", &self.llm.api_key_env)?;
        if self.llm.request_timeout_secs == 0 {
            bail!("llm.request_timeout_secs must be > 0");
        }
        for (key, name) in [
            ("backlog_file_name", &self.backlog_file_name),
            ("new_goal_folders_filename", &self.new_goal_folders_filename),
            ("mission_spec_filename", &self.mission_spec_filename),
        ] {
            if name.contains('/') || name.contains('\\') || name == ".." {
                bail!("{key} must be a plain file name, got '{name}'");
            }
        }
        self.goals_dir_rel()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<SecretaryConfig> {
        let cfg: SecretaryConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[test]
    fn defaults_fill_optional_keys() {
        let cfg = parse("default_llm_model_name: gpt-4o-mini\n").expect("parse");
        assert_eq!(cfg.backlog_file_name, "backlog.md");
        assert_eq!(cfg.ai_goals_directory_name, "ai-goals");
        assert_eq!(cfg.new_goal_folders_filename, "new-goal-folders.txt");
        assert_eq!(cfg.mission_spec_filename, "spec.md");
        assert_eq!(cfg.placeholder_task_title, "Task Title");
        assert_eq!(cfg.commit_message, "chore(secretary): add missions from backlog");
        assert_eq!(cfg.logging.log_level, "info");
        assert_eq!(cfg.goals_dir_rel().expect("rel"), "ai-goals");
    }

    #[test]
    fn model_name_is_required() {
        let err = parse("backlog_file_name: todo.md\n").expect_err("missing model");
        assert!(err.to_string().contains("default_llm_model_name"), "{err}");

        let err = parse("default_llm_model_name: '  '\n").expect_err("blank model");
        assert!(err.to_string().contains("default_llm_model_name must not be empty"));
    }

    #[test]
    fn goals_directory_must_stay_inside_repo() {
        let err = parse("default_llm_model_name: m\nai_goals_directory_name: ../elsewhere\n")
            .expect_err("escape");
        assert!(err.to_string().contains("inside the repository"), "{err}");

        let cfg = parse("default_llm_model_name: m\nai_goals_directory_name: ./docs/goals/\n")
            .expect("nested");
        assert_eq!(cfg.goals_dir_rel().expect("rel"), "docs/goals");
    }

    #[test]
    fn file_names_must_not_contain_separators() {
        let err = parse("default_llm_model_name: m\nmission_spec_filename: a/spec.md\n")
            .expect_err("separator");
        assert!(err.to_string().contains("plain file name"), "{err}");
    }
}
