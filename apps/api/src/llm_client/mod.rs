/// LLM Client: the single point of entry for all language-model calls.
///
/// ARCHITECTURAL RULE: No other module may call the completion API directly.
/// The orchestrator talks to the model through the `ResumeGenerator` trait,
/// which this client implements.
///
/// Speaks the OpenAI-compatible chat-completions protocol (Perplexity by default).
/// Transient failures are NOT retried here: a failed call aborts the tailoring
/// run and is reported to the caller.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod extract;
pub mod generator;
pub mod prompts;

pub use generator::{GenerationRequest, ResumeGenerator};

const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("PERPLEXITY_API_KEY is not configured")]
    MissingApiKey,

    #[error("API rejected the credential (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Could not extract a resume from the model output: {0}")]
    MalformedOutput(String),
}

/// Connection settings, read from the environment by `Config`.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if it is non-blank.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn has_credential(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Makes one chat-completion call. Fails fast with `MissingApiKey` before
    /// any network I/O when no credential is configured.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<ChatResponse, LlmError> {
        let api_key = self.api_key().ok_or(LlmError::MissingApiKey)?;

        let request_body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            warn!("LLM API returned {}", status);
            return Err(status_error(status, &body));
        }

        let chat: ChatResponse = serde_json::from_str(&body)?;
        if let Some(usage) = &chat.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }
        Ok(chat)
    }

    /// Calls the model and returns the text of the first choice.
    pub async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let response = self.call(prompt, system).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    fn transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                secs: timeout_secs(self.settings.timeout),
            }
        } else {
            LlmError::Http(e)
        }
    }
}

/// Whole seconds for error messages, rounded up so sub-second bounds don't read as 0.
fn timeout_secs(timeout: Duration) -> u64 {
    timeout.as_secs_f64().ceil() as u64
}

/// Maps a non-success response to an error, keeping the API's message when
/// the body is the usual `{"error": {"message": ...}}` envelope.
fn status_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        _ => LlmError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
