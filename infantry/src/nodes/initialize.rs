//! `initialize_mission`: read the mission spec, extract metadata, prepare files.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::branch_name::sanitize_branch_name;
use crate::core::paths::{normalize_repo_relative, push_unique};
use crate::core::records::MissionMetadata;
use crate::core::types::{MissionStatus, WorkflowState};
use crate::error::MissionError;
use crate::io::code_agent::CodeAgent;
use crate::io::llm::{ChatMessage, LlmClient};
use crate::mission::Mission;

#[instrument(skip_all, fields(mission = %mission.settings.mission_folder))]
pub fn run<L: LlmClient, A: CodeAgent>(
    mission: &Mission<L, A>,
    state: &mut WorkflowState,
) -> Result<()> {
    let settings = &mission.settings;
    let spec = fs::read_to_string(&settings.spec_path).map_err(|source| MissionError::SpecLoad {
        path: settings.spec_path.clone(),
        source,
    })?;

    // The error handler restores this branch, so record it before any later step can fail.
    let original = mission.git.current_branch()?;
    state.mission_context.original_branch_name = original.clone();
    info!(branch = %original, "recorded original branch");

    let rules = &settings.branch_naming;
    let system = mission
        .prompts
        .render_mission_metadata(&rules.valid_branch_types, &rules.default_branch_prefix)?;
    let extraction = mission
        .llm
        .extract::<MissionMetadata>(
            &[ChatMessage::system(system), ChatMessage::user(spec.clone())],
            &settings.title_model,
        )
        .ok_or(MissionError::LlmExtraction("mission metadata"))?;
    state.mission_context.total_cost_usd += extraction.cost_usd;
    let metadata = extraction.record;

    let branch = sanitize_branch_name(&metadata.git_branch_name, rules)
        .ok_or_else(|| MissionError::InvalidBranchName(metadata.git_branch_name.clone()))?;

    let mut to_edit = Vec::new();
    for raw in &metadata.files_to_edit {
        push_unique(&mut to_edit, existing_repo_file(mission, raw)?);
    }
    let mut to_read = Vec::new();
    for raw in &metadata.files_to_read {
        push_unique(&mut to_read, existing_repo_file(mission, raw)?);
    }
    let conventions = existing_repo_file(mission, &settings.conventions_rel)?;
    let mut to_create = Vec::new();
    for raw in &metadata.files_to_create {
        let rel = normalize_repo_relative(raw)
            .ok_or_else(|| MissionError::PathOutsideRepo(raw.clone()))?;
        push_unique(&mut to_create, rel);
    }

    for rel in &to_create {
        let path = settings.repo_root.join(rel);
        if path.exists() {
            warn!(file = %rel, "file marked for creation already exists, keeping it");
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, "").with_context(|| format!("create {}", path.display()))?;
        info!(file = %rel, "created empty file");
    }

    let mut editable = to_edit;
    for rel in to_create {
        push_unique(&mut editable, rel);
    }
    let mut read_only = vec![settings.spec_rel.clone()];
    push_unique(&mut read_only, conventions);
    for rel in to_read {
        if !editable.contains(&rel) {
            push_unique(&mut read_only, rel);
        }
    }

    let ctx = &mut state.mission_context;
    ctx.mission_spec_content = spec;
    ctx.mission_title = metadata.mission_title.trim().to_string();
    ctx.generated_branch_name = branch;
    ctx.editable_files = editable;
    ctx.read_only_files = read_only;
    ctx.status = Some(MissionStatus::InProgress);
    info!(
        title = %ctx.mission_title,
        branch = %ctx.generated_branch_name,
        editable = ctx.editable_files.len(),
        read_only = ctx.read_only_files.len(),
        "mission initialized"
    );
    Ok(())
}

fn existing_repo_file<L, A>(mission: &Mission<L, A>, raw: &str) -> Result<String, MissionError> {
    let rel =
        normalize_repo_relative(raw).ok_or_else(|| MissionError::PathOutsideRepo(raw.to_string()))?;
    if !mission.settings.repo_root.join(&rel).is_file() {
        return Err(MissionError::MissingInputFile(rel));
    }
    Ok(rel)
}
