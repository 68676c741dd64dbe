//! Typed mission failures raised inside workflow nodes.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::git::GitError;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("cannot read mission spec {}: {source}", .path.display())]
    SpecLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("required file does not exist in the repository: {0}")]
    MissingInputFile(String),
    #[error("path must be relative and stay inside the repository: {0}")]
    PathOutsideRepo(String),
    #[error("branch name '{0}' is empty after sanitization")]
    InvalidBranchName(String),
    #[error("failed to create branch '{branch}'")]
    BranchCreationFailed {
        branch: String,
        #[source]
        source: GitError,
    },
    #[error("llm could not produce a valid {0}")]
    LlmExtraction(&'static str),
    #[error("code agent exited with code {exit_code}: {detail}")]
    CodeAgentFailed { exit_code: i32, detail: String },
    #[error("code agent reported errors: {}", .0.join("; "))]
    ReportedErrors(Vec<String>),
    #[error("code agent did not make any commits")]
    NoCommits,
    #[error("failed to write mission report {}: {detail}", .path.display())]
    ReportWrite { path: PathBuf, detail: String },
}
