//! Folding a code-agent run summary into the mission context.

use crate::core::records::RunSummary;
use crate::core::types::{MissionContext, MissionStatus};

/// Why a run summary does not amount to a successful mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunVerdict {
    Success,
    /// The agent reported errors; they were appended to `errors`.
    ReportedErrors(Vec<String>),
    /// The agent exited non-zero without reporting anything specific.
    AgentExit(i32),
    NoCommits,
}

/// Apply `summary` to `ctx` and decide the mission outcome.
///
/// The summary text, agent-reported cost and questions are always recorded.
/// File lists, commits and `status = SUCCESS` are only written when the run
/// produced at least one commit with no errors and a zero exit code.
pub fn apply_run_summary(
    ctx: &mut MissionContext,
    exit_code: i32,
    summary: &RunSummary,
) -> RunVerdict {
    ctx.execution_summary = summary.execution_summary();
    ctx.total_cost_usd += summary.cost_usd.filter(|c| c.is_finite() && *c > 0.0).unwrap_or(0.0);
    ctx.questions_asked = summary.questions_asked.clone();

    let reported = summary.reported_errors();
    if !reported.is_empty() {
        ctx.errors.extend(reported.iter().cloned());
        return RunVerdict::ReportedErrors(reported);
    }
    if exit_code != 0 {
        return RunVerdict::AgentExit(exit_code);
    }
    if summary.commits.is_empty() {
        return RunVerdict::NoCommits;
    }
    if !ctx.errors.is_empty() {
        return RunVerdict::ReportedErrors(ctx.errors.clone());
    }

    ctx.files_modified = summary.files_modified.clone();
    ctx.files_created = summary.files_created.clone();
    ctx.commits = summary.commits.clone();
    ctx.status = Some(MissionStatus::Success);
    RunVerdict::Success
}
