//! Mission data carried through the workflow.
//!
//! These types hold no I/O handles. Nodes mutate them in place, one node at a
//! time, and the report renderer serializes them as its view model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a mission. Unset until initialization succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    InProgress,
    Success,
    Error,
}

impl MissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MissionStatus::InProgress => "IN_PROGRESS",
            MissionStatus::Success => "SUCCESS",
            MissionStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A commit reported by the code agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.hash, self.message)
    }
}

/// Per-file line counts from `git show --numstat`.
///
/// Binary files report `None` for both counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStat {
    pub path: String,
    pub added: Option<u64>,
    pub removed: Option<u64>,
}

/// The tip of the mission branch after the code agent finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadCommit {
    pub hash: String,
    pub summary: String,
    pub files: Vec<FileStat>,
}

/// All mission data, populated progressively by the workflow nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissionContext {
    pub mission_spec_content: String,
    pub mission_title: String,
    pub original_branch_name: String,
    pub generated_branch_name: String,
    pub status: Option<MissionStatus>,
    /// Repo-relative paths the code agent may modify.
    pub editable_files: Vec<String>,
    /// Repo-relative paths handed to the code agent as read-only context.
    pub read_only_files: Vec<String>,
    pub execution_summary: String,
    pub files_modified: Vec<String>,
    pub files_created: Vec<String>,
    pub commits: Vec<CommitRecord>,
    pub questions_asked: Vec<String>,
    pub head_commit: Option<HeadCommit>,
    pub total_cost_usd: f64,
    pub errors: Vec<String>,
    pub report_timestamp: String,
}

/// Envelope passed between workflow nodes.
///
/// `critical_error_message` is the only routing signal: once set, the router
/// sends the workflow to the error handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    pub mission_context: MissionContext,
    pub current_step_name: Option<String>,
    pub critical_error_message: Option<String>,
    /// Node whose failure boundary set `critical_error_message`.
    pub failed_step_name: Option<String>,
}

impl WorkflowState {
    pub fn failed(&self) -> bool {
        self.critical_error_message.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_in_screaming_case() {
        let json = serde_json::to_string(&MissionStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(MissionStatus::Error.to_string(), "ERROR");
    }

    #[test]
    fn commit_record_displays_hash_and_message() {
        let commit = CommitRecord {
            hash: "abc1234".to_string(),
            message: "refactor: rename foo to bar".to_string(),
        };
        assert_eq!(commit.to_string(), "abc1234 - refactor: rename foo to bar");
    }
}
