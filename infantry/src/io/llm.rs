//! Structured-output LLM calls.
//!
//! [`LlmClient`] is the provider seam (one chat completion in, raw text and a
//! cost figure out). [`PromptService`] layers the structured-output contract on
//! top: schema in the system prompt, fence stripping, JSON Schema validation
//! and deserialization. Provider and parsing failures are logged and surface as
//! `None`, never as an error to the caller.

use std::time::Duration;

use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::core::fences::strip_code_fences;
use crate::core::records::StructuredOutput;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Raw provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub cost_usd: f64,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing provider credential: environment variable {var} is not set")]
    MissingCredential { var: String },
    #[error("llm request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("llm provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm provider returned no message content")]
    EmptyResponse,
}

/// One chat completion against some provider.
pub trait LlmClient {
    fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<Completion, LlmError>;
}

/// Provider settings (`llm` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub api_base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// True when the credential variable is set to something non-blank.
    pub fn credential_present(&self) -> bool {
        std::env::var(&self.api_key_env).is_ok_and(|key| !key.trim().is_empty())
    }
}

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct HttpLlmClient {
    api_base_url: String,
    api_key_env: String,
    http: reqwest::blocking::Client,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
            http,
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    cost: Option<f64>,
}

impl LlmClient for HttpLlmClient {
    #[instrument(skip_all, fields(model))]
    fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let api_key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingCredential {
                var: self.api_key_env.clone(),
            })?;

        let url = format!("{}/chat/completions", self.api_base_url);
        debug!(%url, messages = messages.len(), "sending chat completion");
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model,
                messages,
                temperature: 0.0,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json()?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;
        let cost_usd = parsed.usage.and_then(|u| u.cost).unwrap_or(0.0);
        Ok(Completion { content, cost_usd })
    }
}

/// A validated record plus what it cost to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub record: T,
    pub cost_usd: f64,
}

/// Structured-output front end over an [`LlmClient`].
pub struct PromptService<C> {
    client: C,
}

impl<C: LlmClient> PromptService<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Ask `model` for a `T`. Returns `None` on any provider or validation failure.
    #[instrument(skip_all, fields(record = T::NAME, model))]
    pub fn extract<T: StructuredOutput>(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Option<Extraction<T>> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(ChatMessage::system(schema_instructions(T::SCHEMA)));
        full.extend_from_slice(messages);

        let completion = match self.client.complete(model, &full) {
            Ok(completion) => completion,
            Err(err) => {
                error!(record = T::NAME, err = %err, "llm call failed");
                return None;
            }
        };

        match parse_structured::<T>(&completion.content) {
            Ok(record) => {
                debug!(
                    record = T::NAME,
                    cost_usd = completion.cost_usd,
                    "structured output accepted"
                );
                Some(Extraction {
                    record,
                    cost_usd: completion.cost_usd,
                })
            }
            Err(reason) => {
                warn!(record = T::NAME, %reason, "structured output rejected");
                None
            }
        }
    }
}

fn schema_instructions(schema: &str) -> String {
    format!(
        "Reply with exactly one JSON object that validates against the JSON Schema below. \
         Do not add prose before or after it. Field descriptions in the schema explain \
         what each field must contain.\n\n{}",
        schema.trim()
    )
}

/// Strip fences, parse, validate against `T::SCHEMA`, deserialize.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T, String> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err("empty response".to_string());
    }
    let instance: Value =
        serde_json::from_str(body).map_err(|err| format!("response is not JSON: {err}"))?;
    let schema: Value =
        serde_json::from_str(T::SCHEMA).map_err(|err| format!("invalid schema: {err}"))?;
    validate_schema(&instance, &schema)?;
    serde_json::from_value(instance).map_err(|err| format!("response does not fit record: {err}"))
}

/// Validate JSON instance against a JSON Schema (Draft 2020-12).
fn validate_schema(instance: &Value, schema: &Value) -> Result<(), String> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| format!("compile json schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(format!(
            "schema validation failed:\n- {}",
            messages.join("\n- ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::{MissionMetadata, RunSummary};
    use crate::test_support::ScriptedLlm;

    const METADATA_JSON: &str = r#"{
        "mission_title": "Rename foo to bar",
        "git_branch_name": "refactor/rename-foo-to-bar",
        "files_to_edit": ["lib/x.py"],
        "files_to_read": [],
        "files_to_create": []
    }"#;

    #[test]
    fn extracts_fenced_record_with_cost() {
        let llm =
            ScriptedLlm::new(vec![Ok(format!("```json\n{METADATA_JSON}\n```"))]).with_cost(0.02);
        let service = PromptService::new(llm);

        let got = service
            .extract::<MissionMetadata>(&[ChatMessage::user("spec")], "gpt-4.1-mini")
            .expect("extraction");
        assert_eq!(got.record.mission_title, "Rename foo to bar");
        assert_eq!(got.record.files_to_edit, vec!["lib/x.py"]);
        assert!((got.cost_usd - 0.02).abs() < f64::EPSILON);

        let requests = service.client().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "gpt-4.1-mini");
        assert_eq!(requests[0].1[0].role, Role::System);
        assert!(requests[0].1[0].content.contains("\"git_branch_name\""));
        assert_eq!(requests[0].1[1], ChatMessage::user("spec"));
    }

    #[test]
    fn schema_violation_returns_none() {
        let llm = ScriptedLlm::new(vec![Ok(r#"{"mission_title": "x"}"#.to_string())]);
        let service = PromptService::new(llm);
        assert!(
            service
                .extract::<MissionMetadata>(&[ChatMessage::user("spec")], "m")
                .is_none()
        );
    }

    #[test]
    fn provider_error_returns_none() {
        let llm = ScriptedLlm::new(vec![Err("boom".to_string())]);
        let service = PromptService::new(llm);
        assert!(
            service
                .extract::<RunSummary>(&[ChatMessage::user("out")], "m")
                .is_none()
        );
    }

    #[test]
    fn non_json_is_rejected_with_reason() {
        let err = parse_structured::<RunSummary>("I could not summarize this.").unwrap_err();
        assert!(err.contains("not JSON"));
        assert_eq!(
            parse_structured::<RunSummary>("```\n```").unwrap_err(),
            "empty response"
        );
    }

    #[test]
    fn missing_credential_is_reported_before_any_request() {
        let config = LlmConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            api_key_env: "INFANTRY_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            request_timeout_secs: 1,
        };
        assert!(!config.credential_present());
        let client = HttpLlmClient::new(&config).expect("client");
        let err = client
            .complete("m", &[ChatMessage::user("hi")])
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential { .. }));

        let service = PromptService::new(client);
        assert!(
            service
                .extract::<RunSummary>(&[ChatMessage::user("out")], "m")
                .is_none()
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).expect("json");
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
