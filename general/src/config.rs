use std::path::PathBuf;

use anyhow::{Result, bail};
use infantry::core::paths::normalize_repo_relative;
use infantry::io::config::{ValidateConfig, require_non_empty};
use infantry::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

fn default_secretary_command() -> Vec<String> {
    vec!["secretary".to_string()]
}

fn default_infantry_command() -> Vec<String> {
    vec!["infantry".to_string()]
}

fn default_ai_goals_directory_name() -> String {
    "ai-goals".to_string()
}

fn default_new_goal_folders_filename() -> String {
    "new-goal-folders.txt".to_string()
}

/// General configuration.
///
/// `ai_goals_directory_name` and `new_goal_folders_filename` must match the
/// secretary config so the manifest is found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralConfig {
    #[serde(default)]
    pub root_git_path: Option<PathBuf>,
    /// Program and leading arguments used to start the secretary.
    #[serde(default = "default_secretary_command")]
    pub secretary_command: Vec<String>,
    #[serde(default = "default_infantry_command")]
    pub infantry_command: Vec<String>,
    /// Passed on as `--config` when set.
    #[serde(default)]
    pub secretary_config_path: Option<PathBuf>,
    #[serde(default)]
    pub infantry_config_path: Option<PathBuf>,
    #[serde(default = "default_ai_goals_directory_name")]
    pub ai_goals_directory_name: String,
    #[serde(default = "default_new_goal_folders_filename")]
    pub new_goal_folders_filename: String,
    #[serde(default)]
    pub stop_on_mission_failure: bool,
    #[serde(flatten)]
    pub logging: LoggingConfig,
}

impl ValidateConfig for GeneralConfig {
    fn validate(&self) -> Result<()> {
        for (key, argv) in [
            ("secretary_command", &self.secretary_command),
            ("infantry_command", &self.infantry_command),
        ] {
            match argv.first() {
                Some(program) => require_non_empty(key, program)?,
                None => bail!("{key} must name a program"),
            }
        }
        require_non_empty("new_goal_folders_filename", &self.new_goal_folders_filename)?;
        if normalize_repo_relative(&self.ai_goals_directory_name).is_none() {
            bail!(
                "ai_goals_directory_name '{}' must be a path inside the repository",
                self.ai_goals_directory_name
            );
        }
        self.logging.validate()?;
        Ok(())
    }
}
