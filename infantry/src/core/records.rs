//! Records extracted from free-form text by structured LLM calls.
//!
//! Each record ships a JSON Schema (Draft 2020-12). The schema text is embedded
//! in the system prompt and the raw response is validated against it before
//! deserialization.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::types::CommitRecord;

const MISSION_METADATA_SCHEMA: &str = include_str!("../../schemas/mission_metadata.schema.json");
const RUN_SUMMARY_SCHEMA: &str = include_str!("../../schemas/run_summary.schema.json");

/// A record type the prompt service can extract.
pub trait StructuredOutput: DeserializeOwned {
    /// Short name used in logs.
    const NAME: &'static str;
    /// JSON Schema the raw response must satisfy.
    const SCHEMA: &'static str;
}

/// Metadata pulled out of a mission spec.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MissionMetadata {
    pub mission_title: String,
    pub git_branch_name: String,
    #[serde(default)]
    pub files_to_edit: Vec<String>,
    #[serde(default)]
    pub files_to_read: Vec<String>,
    #[serde(default)]
    pub files_to_create: Vec<String>,
}

impl StructuredOutput for MissionMetadata {
    const NAME: &'static str = "mission_metadata";
    const SCHEMA: &'static str = MISSION_METADATA_SCHEMA;
}

/// Summary of one code-agent run, extracted from its stdout and stderr.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub changes: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub files_created: Vec<String>,
    #[serde(default)]
    pub errors_reported: Vec<String>,
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    /// Spend reported by the agent itself, when its output shows one.
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub questions_asked: Vec<String>,
    #[serde(default)]
    pub raw_summary: String,
}

impl StructuredOutput for RunSummary {
    const NAME: &'static str = "run_summary";
    const SCHEMA: &'static str = RUN_SUMMARY_SCHEMA;
}

impl RunSummary {
    /// Bullet list of changes, or the raw summary when there are none.
    pub fn execution_summary(&self) -> String {
        let bullets: Vec<String> = self
            .changes
            .iter()
            .map(|change| change.trim())
            .filter(|change| !change.is_empty())
            .map(|change| format!("- {change}"))
            .collect();
        if bullets.is_empty() {
            self.raw_summary.trim().to_string()
        } else {
            bullets.join("\n")
        }
    }

    /// Reported errors with blank entries dropped.
    pub fn reported_errors(&self) -> Vec<String> {
        self.errors_reported
            .iter()
            .map(|err| err.trim())
            .filter(|err| !err.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_are_valid_json() {
        for schema in [MissionMetadata::SCHEMA, RunSummary::SCHEMA] {
            let value: serde_json::Value = serde_json::from_str(schema).expect("schema json");
            assert_eq!(value["type"], "object");
        }
    }

    #[test]
    fn execution_summary_prefers_bullets() {
        let summary = RunSummary {
            changes: vec!["Renamed foo to bar".to_string(), "  ".to_string()],
            files_modified: Vec::new(),
            files_created: Vec::new(),
            errors_reported: Vec::new(),
            commits: Vec::new(),
            cost_usd: None,
            questions_asked: Vec::new(),
            raw_summary: "raw".to_string(),
        };
        assert_eq!(summary.execution_summary(), "- Renamed foo to bar");
    }

    #[test]
    fn execution_summary_falls_back_to_raw_text() {
        let summary: RunSummary =
            serde_json::from_str(r#"{"raw_summary": " nothing changed "}"#).expect("parse");
        assert_eq!(summary.execution_summary(), "nothing changed");
        assert!(summary.reported_errors().is_empty());
    }
}
