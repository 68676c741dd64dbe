//! `error_handler`: terminal node for failed missions.
//!
//! Everything here is best effort. The handler never touches
//! `critical_error_message`; the first failure is the one that gets reported.

use tracing::{error, instrument, warn};

use crate::core::types::WorkflowState;
use crate::io::code_agent::CodeAgent;
use crate::io::llm::LlmClient;
use crate::mission::Mission;
use crate::nodes::checkout::restore_original_branch;
use crate::nodes::reporting::write_report;

#[instrument(skip_all)]
pub fn run<L: LlmClient, A: CodeAgent>(mission: &Mission<L, A>, state: &mut WorkflowState) {
    error!(
        step = state.failed_step_name.as_deref().unwrap_or("unknown"),
        message = state.critical_error_message.as_deref().unwrap_or(""),
        errors = ?state.mission_context.errors,
        "mission failed"
    );

    if let Err(err) = write_report(&mission.settings, state) {
        warn!(err = %err, "could not write mission report on the error path");
    }

    if let Err(err) = restore_original_branch(
        &mission.git,
        &state.mission_context.original_branch_name,
    ) {
        warn!(err = %format!("{err:#}"), "could not restore original branch");
    }
}
