//! Component configuration.
//!
//! Each binary reads one YAML file (or TOML, picked by extension) into a typed
//! struct and validates it before doing anything else. Unlike state files, a
//! missing config is an error: there is no useful default repository.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::branch_name::BranchNamingConfig;
use crate::io::code_agent::AiderAgent;
use crate::io::llm::LlmConfig;
use crate::logging::LoggingConfig;

/// Post-parse checks a config struct runs before it is handed out.
pub trait ValidateConfig {
    fn validate(&self) -> Result<()>;
}

/// Read, parse and validate the config at `path`.
///
/// `.toml` files are parsed as TOML, everything else as YAML.
pub fn load_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + ValidateConfig,
{
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: T = if is_toml {
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        serde_yaml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    };
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Directory that relative template paths in the config at `path` resolve against.
pub fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Pick the repository root: the CLI flag wins over the config value.
///
/// The result is canonicalized and must be an existing directory.
pub fn resolve_repo_root(cli: Option<&Path>, configured: Option<&Path>) -> Result<PathBuf> {
    let raw = cli
        .or(configured)
        .ok_or_else(|| {
            anyhow!("root_git_path is not set (use --root-git-path or the config key)")
        })?;
    let root = raw
        .canonicalize()
        .with_context(|| format!("resolve root_git_path {}", raw.display()))?;
    if !root.is_dir() {
        bail!("root_git_path {} is not a directory", root.display());
    }
    Ok(root)
}

/// Fail when the provider key named by `llm.api_key_env` is absent or blank.
pub fn require_credential(llm: &LlmConfig) -> Result<()> {
    if !llm.credential_present() {
        bail!(
            "environment variable {} must hold the LLM provider API key",
            llm.api_key_env
        );
    }
    Ok(())
}

/// Fail with `{key} must not be empty` for blank values.
pub fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{key} must not be empty");
    }
    Ok(())
}

/// Settings for the code-editing agent subprocess (`code_agent` section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodeAgentConfig {
    pub command: String,
    /// Extra flags inserted before the headless flag set.
    pub extra_args: Vec<String>,
    /// Kill the agent after this many seconds. Unset means no deadline.
    pub timeout_secs: Option<u64>,
    /// Bytes of stdout and of stderr kept for the summary call.
    pub output_limit_bytes: usize,
}

impl Default for CodeAgentConfig {
    fn default() -> Self {
        Self {
            command: "aider".to_string(),
            extra_args: Vec::new(),
            timeout_secs: None,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl CodeAgentConfig {
    pub fn agent(&self) -> AiderAgent {
        AiderAgent {
            command: self.command.clone(),
            extra_args: self.extra_args.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

fn default_spec_filename() -> String {
    "spec.md".to_string()
}

fn default_report_filename() -> String {
    "mission-report.md".to_string()
}

fn default_conventions_path() -> String {
    "CONVENTIONS.md".to_string()
}

/// Infantry configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfantryConfig {
    #[serde(default)]
    pub root_git_path: Option<PathBuf>,
    /// Repo-relative mission folder; the CLI flag overrides it.
    #[serde(default)]
    pub mission_folder_path: Option<String>,
    #[serde(default = "default_spec_filename")]
    pub mission_spec_filename: String,
    #[serde(default = "default_report_filename")]
    pub mission_report_filename: String,
    /// Report template, relative to the config file's directory unless absolute.
    pub mission_report_template_filename: String,

    pub aider_code_model: String,
    pub aider_summary_model: String,
    pub mission_title_extraction_model: String,

    /// Repo-relative conventions file handed to the agent read-only.
    #[serde(default = "default_conventions_path")]
    pub conventions_file_path: String,
    #[serde(default)]
    pub aider_config_file_path: Option<String>,

    #[serde(default)]
    pub branch_naming: BranchNamingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub code_agent: CodeAgentConfig,
    #[serde(flatten)]
    pub logging: LoggingConfig,
}

impl ValidateConfig for InfantryConfig {
    fn validate(&self) -> Result<()> {
        require_non_empty("mission_spec_filename", &self.mission_spec_filename)?;
        require_non_empty("mission_report_filename", &self.mission_report_filename)?;
        require_non_empty(
            "mission_report_template_filename",
            &self.mission_report_template_filename,
        )?;
        require_non_empty("aider_code_model", &self.aider_code_model)?;
        require_non_empty("aider_summary_model", &self.aider_summary_model)?;
        require_non_empty(
            "mission_title_extraction_model",
            &self.mission_title_extraction_model,
        )?;
        require_non_empty("conventions_file_path", &self.conventions_file_path)?;
        require_non_empty("llm.api_base_url", &self.llm.api_base_url)?;
        require_non_empty("llm.api_key_env", &self.llm.api_key_env)?;
        require_non_empty("code_agent.command", &self.code_agent.command)?;
        if self.code_agent.output_limit_bytes == 0 {
            bail!("code_agent.output_limit_bytes must be > 0");
        }
        if self.code_agent.timeout_secs == Some(0) {
            bail!("code_agent.timeout_secs must be > 0 when set");
        }
        if self.llm.request_timeout_secs == 0 {
            bail!("llm.request_timeout_secs must be > 0");
        }
        self.branch_naming.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
