//! Infantry: run one mission against a target repository.
//!
//! Exit codes: 0 when the mission succeeds, 1 on configuration or startup
//! errors, 2 when the mission ends in ERROR.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use infantry::core::types::MissionStatus;
use infantry::exit_codes;
use infantry::io::code_agent::AiderAgent;
use infantry::io::config::{
    InfantryConfig, config_dir, load_config, require_credential, resolve_repo_root,
};
use infantry::io::llm::HttpLlmClient;
use infantry::logging;
use infantry::mission::{Mission, MissionSettings};

#[derive(Parser)]
#[command(
    name = "infantry",
    version,
    about = "Execute one mission folder in a target git repository"
)]
struct Cli {
    /// Absolute path of the target repository (overrides `root_git_path`).
    #[arg(long)]
    root_git_path: Option<PathBuf>,
    /// Mission folder, relative to the repository root (overrides `mission_folder_path`).
    #[arg(long)]
    mission_folder_path: Option<String>,
    /// Infantry config file (YAML, or TOML by extension).
    #[arg(long, default_value = "config/infantry.yaml")]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    let mission = match setup(&cli) {
        Ok(mission) => mission,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    };

    let state = mission.run();
    let succeeded =
        !state.failed() && state.mission_context.status == Some(MissionStatus::Success);
    if let Some(message) = &state.critical_error_message {
        eprintln!("mission failed: {message}");
    }
    std::process::exit(if succeeded {
        exit_codes::OK
    } else {
        exit_codes::MISSION_FAILED
    });
}

fn setup(cli: &Cli) -> Result<Mission<HttpLlmClient, AiderAgent>> {
    let cfg: InfantryConfig = load_config(&cli.config)?;
    logging::init(&cfg.logging)?;
    require_credential(&cfg.llm)?;

    let repo_root = resolve_repo_root(cli.root_git_path.as_deref(), cfg.root_git_path.as_deref())?;
    let mission_folder = cli
        .mission_folder_path
        .as_deref()
        .or(cfg.mission_folder_path.as_deref())
        .ok_or_else(|| {
            anyhow!("mission_folder_path is not set (use --mission-folder-path or the config key)")
        })?;
    let settings =
        MissionSettings::from_config(&cfg, &repo_root, mission_folder, &config_dir(&cli.config))?;

    let llm = HttpLlmClient::new(&cfg.llm).context("build llm client")?;
    Mission::new(settings, llm, cfg.code_agent.agent())
}
