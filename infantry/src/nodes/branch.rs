//! `git_branch`: create and check out the mission branch.

use anyhow::Result;
use chrono::Local;
use tracing::{info, instrument, warn};

use crate::core::branch_name::{collision_suffix, with_suffix};
use crate::core::types::WorkflowState;
use crate::error::MissionError;
use crate::io::code_agent::CodeAgent;
use crate::io::llm::LlmClient;
use crate::mission::Mission;

#[instrument(skip_all, fields(branch = %state.mission_context.generated_branch_name))]
pub fn run<L: LlmClient, A: CodeAgent>(
    mission: &Mission<L, A>,
    state: &mut WorkflowState,
) -> Result<()> {
    warn_on_stray_changes(mission);

    let rules = &mission.settings.branch_naming;
    let proposed = state.mission_context.generated_branch_name.clone();
    let mut branch = proposed.clone();
    if mission.git.branch_exists(&branch)? {
        let suffix = collision_suffix(Local::now().naive_local());
        branch = with_suffix(&proposed, &suffix, rules.max_branch_name_length)
            .ok_or_else(|| MissionError::InvalidBranchName(format!("{proposed}{suffix}")))?;
        if mission.git.branch_exists(&branch)? {
            let sha = mission.git.head_short_sha(rules.branch_hash_length)?;
            let suffix = format!("-{sha}");
            branch = with_suffix(&branch, &suffix, rules.max_branch_name_length)
                .ok_or_else(|| MissionError::InvalidBranchName(format!("{branch}{suffix}")))?;
        }
        info!(from = %proposed, to = %branch, "branch name taken, renamed");
        state.mission_context.generated_branch_name = branch.clone();
    }

    mission
        .git
        .checkout(&branch, true)
        .map_err(|source| MissionError::BranchCreationFailed {
            branch: branch.clone(),
            source,
        })?;
    info!(%branch, "mission branch checked out");
    Ok(())
}

/// The agent commits everything it touches; flag unrelated edits up front.
fn warn_on_stray_changes<L, A>(mission: &Mission<L, A>) {
    let prefix = format!("{}/", mission.settings.mission_folder);
    match mission.git.changes_outside(&[prefix.as_str()]) {
        Ok(entries) if entries.is_empty() => {}
        Ok(entries) => {
            let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
            warn!(
                count = entries.len(),
                paths = %paths.join(", "),
                "working tree has changes outside the mission folder"
            );
        }
        Err(err) => warn!(err = %err, "could not inspect working tree status"),
    }
}
