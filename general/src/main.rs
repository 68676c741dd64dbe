//! General: run the secretary, then one infantry mission per new folder.
//!
//! Exit codes: 0 when every mission succeeds, 1 on configuration or startup
//! errors, 2 when the secretary or any mission fails.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use general::campaign::{Campaign, CampaignReport, ProcessRunner};
use general::config::GeneralConfig;
use infantry::exit_codes;
use infantry::io::config::{load_config, resolve_repo_root};
use infantry::logging;

#[derive(Parser)]
#[command(name = "general", version, about = "Drive a backlog through secretary and infantry")]
struct Cli {
    /// Absolute path of the target repository (overrides `root_git_path`).
    #[arg(long)]
    root_git_path: Option<PathBuf>,
    /// General config file (YAML, or TOML by extension).
    #[arg(long, default_value = "config/general.yaml")]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    let campaign = match setup(&cli) {
        Ok(campaign) => campaign,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    };

    match campaign.run() {
        Ok(report) => std::process::exit(exit_code(&report)),
        Err(err) => {
            eprintln!("campaign aborted: {err:#}");
            std::process::exit(exit_codes::MISSION_FAILED);
        }
    }
}

fn setup(cli: &Cli) -> Result<Campaign<ProcessRunner>> {
    let cfg: GeneralConfig = load_config(&cli.config)?;
    logging::init(&cfg.logging)?;
    let repo_root = resolve_repo_root(cli.root_git_path.as_deref(), cfg.root_git_path.as_deref())?;
    Ok(Campaign::new(cfg, &repo_root, ProcessRunner))
}

fn exit_code(report: &CampaignReport) -> i32 {
    for mission in report.missions.iter().filter(|m| !m.succeeded()) {
        eprintln!("mission {} failed with exit code {}", mission.folder, mission.exit_code);
    }
    if report.all_succeeded() {
        exit_codes::OK
    } else {
        exit_codes::MISSION_FAILED
    }
}
