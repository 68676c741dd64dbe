//! Secretary: split the backlog into mission folders.
//!
//! Exit codes: 0 when the run completes (per-task failures included), 1 on
//! configuration, filesystem or git errors.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use infantry::exit_codes;
use infantry::io::config::{load_config, require_credential, resolve_repo_root};
use infantry::io::llm::HttpLlmClient;
use infantry::logging;
use secretary::config::SecretaryConfig;
use secretary::processor::{Secretary, SecretarySettings};

#[derive(Parser)]
#[command(name = "secretary", version, about = "Turn a backlog file into mission folders")]
struct Cli {
    /// Absolute path of the target repository (overrides `root_git_path`).
    #[arg(long)]
    root_git_path: Option<PathBuf>,
    /// Secretary config file (YAML, or TOML by extension).
    #[arg(long, default_value = "config/secretary.yaml")]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("{err:#}");
        std::process::exit(exit_codes::INVALID);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg: SecretaryConfig = load_config(&cli.config)?;
    logging::init(&cfg.logging)?;
    require_credential(&cfg.llm)?;

    let repo_root = resolve_repo_root(cli.root_git_path.as_deref(), cfg.root_git_path.as_deref())?;
    let settings = SecretarySettings::from_config(&cfg, &repo_root)?;
    let llm = HttpLlmClient::new(&cfg.llm).context("build llm client")?;

    let outcome = Secretary::new(settings, llm).process()?;
    for failure in &outcome.failed {
        eprintln!("task '{}' failed: {}", failure.title, failure.error);
    }
    Ok(())
}
