use crate::core::types::{MissionStatus, WorkflowState};

/// Check mission-level invariants on a workflow state.
///
/// Returns one message per violation; an empty list means the state is sound.
pub fn validate_mission_invariants(state: &WorkflowState) -> Vec<String> {
    let mut errors = Vec::new();
    let ctx = &state.mission_context;

    if ctx.status == Some(MissionStatus::Success) {
        if ctx.commits.is_empty() {
            errors.push("status SUCCESS requires at least one commit".to_string());
        }
        if !ctx.errors.is_empty() {
            errors.push(format!(
                "status SUCCESS with {} recorded error(s)",
                ctx.errors.len()
            ));
        }
    }
    if ctx.status == Some(MissionStatus::Error) && state.critical_error_message.is_none() {
        errors.push("status ERROR without a critical error message".to_string());
    }
    if state.critical_error_message.is_some() && ctx.status == Some(MissionStatus::Success) {
        errors.push("critical error recorded on a successful mission".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CommitRecord, MissionContext};

    #[test]
    fn sound_states_have_no_violations() {
        let mut state = WorkflowState::default();
        assert!(validate_mission_invariants(&state).is_empty());

        state.mission_context.status = Some(MissionStatus::Success);
        state.mission_context.commits.push(CommitRecord {
            hash: "abc".to_string(),
            message: "msg".to_string(),
        });
        assert!(validate_mission_invariants(&state).is_empty());
    }

    #[test]
    fn reports_each_violation() {
        let state = WorkflowState {
            mission_context: MissionContext {
                status: Some(MissionStatus::Success),
                errors: vec!["boom".to_string()],
                ..MissionContext::default()
            },
            critical_error_message: Some("code_modification: boom".to_string()),
            ..WorkflowState::default()
        };
        let errors = validate_mission_invariants(&state);
        assert!(errors.iter().any(|e| e.contains("at least one commit")));
        assert!(errors.iter().any(|e| e.contains("recorded error")));
        assert!(errors.iter().any(|e| e.contains("critical error recorded")));
    }

    #[test]
    fn error_status_needs_message() {
        let mut state = WorkflowState::default();
        state.mission_context.status = Some(MissionStatus::Error);
        let errors = validate_mission_invariants(&state);
        assert_eq!(errors.len(), 1);
    }
}
