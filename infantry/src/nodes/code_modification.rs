//! `code_modification`: run the code agent, then summarize what it did.

use std::path::Path;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::records::RunSummary;
use crate::core::summary::{RunVerdict, apply_run_summary};
use crate::core::types::{HeadCommit, WorkflowState};
use crate::error::MissionError;
use crate::io::code_agent::{AgentInvocation, CodeAgent};
use crate::io::llm::{ChatMessage, LlmClient};
use crate::mission::Mission;

const STDERR_DETAIL_BYTES: usize = 500;

#[instrument(skip_all, fields(branch = %state.mission_context.generated_branch_name))]
pub fn run<L: LlmClient, A: CodeAgent>(
    mission: &Mission<L, A>,
    state: &mut WorkflowState,
) -> Result<()> {
    let settings = &mission.settings;
    let ctx = &mut state.mission_context;

    for rel in &ctx.editable_files {
        if !settings.repo_root.join(rel).is_file() {
            return Err(MissionError::MissingInputFile(rel.clone()).into());
        }
    }

    let spec_filename = Path::new(&settings.spec_rel)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| settings.spec_rel.clone());
    let invocation = AgentInvocation {
        workdir: settings.repo_root.clone(),
        prompt: mission.prompts.render_code_agent(&spec_filename)?,
        model: settings.code_model.clone(),
        auto_commits: true,
        config_file: settings.aider_config.clone(),
        read_only_files: ctx.read_only_files.clone(),
        editable_files: ctx.editable_files.clone(),
    };
    let outcome = mission.agent.run(&invocation);

    let messages = [
        ChatMessage::system(mission.prompts.render_run_summary()?),
        ChatMessage::user(mission.prompts.render_run_transcript(
            outcome.exit_code,
            &outcome.stdout,
            &outcome.stderr,
        )?),
    ];
    let Some(extraction) = mission
        .llm
        .extract::<RunSummary>(&messages, &settings.summary_model)
    else {
        if outcome.exit_code != 0 {
            return Err(agent_failed(outcome.exit_code, &outcome.stderr).into());
        }
        return Err(MissionError::NoCommits.into());
    };
    ctx.total_cost_usd += extraction.cost_usd;

    match apply_run_summary(ctx, outcome.exit_code, &extraction.record) {
        RunVerdict::Success => {}
        RunVerdict::ReportedErrors(errors) => {
            return Err(MissionError::ReportedErrors(errors).into());
        }
        RunVerdict::AgentExit(code) => return Err(agent_failed(code, &outcome.stderr).into()),
        RunVerdict::NoCommits => return Err(MissionError::NoCommits.into()),
    }

    match head_commit(mission) {
        Ok(head) => ctx.head_commit = Some(head),
        Err(err) => warn!(err = %err, "could not read head commit details"),
    }
    info!(
        commits = ctx.commits.len(),
        files_modified = ctx.files_modified.len(),
        files_created = ctx.files_created.len(),
        "code modification succeeded"
    );
    Ok(())
}

fn head_commit<L, A>(mission: &Mission<L, A>) -> Result<HeadCommit> {
    Ok(HeadCommit {
        hash: mission.git.last_commit_hash()?,
        summary: mission.git.last_commit_summary()?,
        files: mission.git.last_commit_file_stats()?,
    })
}

fn agent_failed(exit_code: i32, stderr: &str) -> MissionError {
    let trimmed = stderr.trim();
    let detail = if trimmed.is_empty() {
        "no stderr output".to_string()
    } else {
        tail(trimmed, STDERR_DETAIL_BYTES).to_string()
    };
    MissionError::CodeAgentFailed { exit_code, detail }
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
