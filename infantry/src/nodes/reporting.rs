//! `mission_reporting`: render the mission report into the mission folder.

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use tracing::{info, instrument};

use crate::core::types::{MissionContext, WorkflowState};
use crate::error::MissionError;
use crate::io::code_agent::CodeAgent;
use crate::io::llm::LlmClient;
use crate::io::template::render_template_file;
use crate::mission::{Mission, MissionSettings};

pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// View model handed to the report template.
#[derive(Debug, Serialize)]
pub struct ReportView<'a> {
    pub mission: &'a MissionContext,
    pub status: &'static str,
    pub total_cost: String,
    pub failed_step: Option<&'a str>,
    pub critical_error: Option<&'a str>,
    pub mission_folder: &'a str,
    pub spec_file: &'a str,
}

impl<'a> ReportView<'a> {
    pub fn new(settings: &'a MissionSettings, state: &'a WorkflowState) -> Self {
        let mission = &state.mission_context;
        Self {
            mission,
            status: mission.status.map_or("NOT STARTED", |s| s.as_str()),
            total_cost: format!("{:.4}", mission.total_cost_usd),
            failed_step: state.failed_step_name.as_deref(),
            critical_error: state.critical_error_message.as_deref(),
            mission_folder: &settings.mission_folder,
            spec_file: &settings.spec_rel,
        }
    }
}

#[instrument(skip_all)]
pub fn run<L: LlmClient, A: CodeAgent>(
    mission: &Mission<L, A>,
    state: &mut WorkflowState,
) -> Result<()> {
    write_report(&mission.settings, state)?;
    Ok(())
}

/// Stamp `report_timestamp` and render the report for the current state.
pub fn write_report(
    settings: &MissionSettings,
    state: &mut WorkflowState,
) -> Result<(), MissionError> {
    state.mission_context.report_timestamp =
        Local::now().format(REPORT_TIMESTAMP_FORMAT).to_string();
    let view = ReportView::new(settings, state);
    render_template_file(&settings.report_template, &view, &settings.report_path).map_err(|err| {
        MissionError::ReportWrite {
            path: settings.report_path.clone(),
            detail: format!("{err:#}"),
        }
    })?;
    info!(report = %settings.report_path.display(), status = view.status, "mission report written");
    Ok(())
}
