//! Prompt texts for the code agent and the structured LLM calls.

use anyhow::Result;
use minijinja::{Environment, context};

const CODE_AGENT_TEMPLATE: &str = include_str!("prompts/code_agent.md");
const MISSION_METADATA_TEMPLATE: &str = include_str!("prompts/mission_metadata.md");
const RUN_SUMMARY_TEMPLATE: &str = include_str!("prompts/run_summary.md");
const RUN_TRANSCRIPT_TEMPLATE: &str = include_str!("prompts/run_transcript.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("code_agent", CODE_AGENT_TEMPLATE)?;
        env.add_template("mission_metadata", MISSION_METADATA_TEMPLATE)?;
        env.add_template("run_summary", RUN_SUMMARY_TEMPLATE)?;
        env.add_template("run_transcript", RUN_TRANSCRIPT_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Positional instruction for the code agent; names the mission spec by basename.
    pub fn render_code_agent(&self, spec_filename: &str) -> Result<String> {
        let template = self.env.get_template("code_agent")?;
        Ok(template.render(context! { spec_filename })?)
    }

    /// System prompt for mission metadata extraction.
    pub fn render_mission_metadata(
        &self,
        branch_types: &[String],
        default_prefix: &str,
    ) -> Result<String> {
        let template = self.env.get_template("mission_metadata")?;
        Ok(template.render(context! { branch_types, default_prefix })?)
    }

    /// System prompt for summarizing a code-agent run.
    pub fn render_run_summary(&self) -> Result<String> {
        let template = self.env.get_template("run_summary")?;
        Ok(template.render(context! {})?)
    }

    /// User message carrying the agent's exit code and output.
    pub fn render_run_transcript(
        &self,
        exit_code: i32,
        stdout: &str,
        stderr: &str,
    ) -> Result<String> {
        let template = self.env.get_template("run_transcript")?;
        Ok(template.render(context! {
            exit_code,
            stdout => stdout.trim(),
            stderr => stderr.trim(),
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PromptEngine {
        PromptEngine::new().expect("templates parse")
    }

    #[test]
    fn code_agent_prompt_names_spec_basename() {
        let prompt = engine().render_code_agent("spec.md").expect("render");
        assert!(prompt.contains("`spec.md`"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn metadata_prompt_lists_allowed_types() {
        let types = vec!["feature".to_string(), "fix".to_string()];
        let prompt = engine()
            .render_mission_metadata(&types, "feature")
            .expect("render");
        assert!(prompt.contains("must be one of: feature, fix."));
        assert!(prompt.contains("Use `feature` when none fits"));
    }

    #[test]
    fn transcript_marks_empty_streams() {
        let text = engine()
            .render_run_transcript(0, "", "  \n")
            .expect("render");
        assert!(text.starts_with("Code agent exit code: 0\n"));
        assert_eq!(text.matches("(empty)").count(), 2);

        let text = engine()
            .render_run_transcript(1, "Applied edit to lib/x.py\n", "boom")
            .expect("render");
        assert!(text.contains("## stdout\nApplied edit to lib/x.py\n"));
        assert!(text.contains("## stderr\nboom"));
    }
}
