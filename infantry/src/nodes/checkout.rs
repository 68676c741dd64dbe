//! `git_checkout_original_branch`: return to the branch the mission started on.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::types::WorkflowState;
use crate::io::code_agent::CodeAgent;
use crate::io::git::Git;
use crate::io::llm::LlmClient;
use crate::mission::Mission;

#[instrument(skip_all, fields(original = %state.mission_context.original_branch_name))]
pub fn run<L: LlmClient, A: CodeAgent>(
    mission: &Mission<L, A>,
    state: &mut WorkflowState,
) -> Result<()> {
    restore_original_branch(&mission.git, &state.mission_context.original_branch_name)?;
    Ok(())
}

/// Check out `original` unless it is empty or already current.
///
/// Returns whether a checkout happened.
pub fn restore_original_branch(git: &Git, original: &str) -> Result<bool> {
    if original.is_empty() {
        warn!("original branch was never recorded, staying put");
        return Ok(false);
    }
    let current = git.current_branch()?;
    if current == original {
        return Ok(false);
    }
    git.checkout(original, false)?;
    info!(from = %current, to = %original, "restored original branch");
    Ok(true)
}
