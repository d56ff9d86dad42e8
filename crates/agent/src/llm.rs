use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use luminova_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    Text,
    JsonObject,
}

/// One chat-completion call: a system persona plus a single user prompt.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub system_persona: String,
    pub prompt: String,
    pub model: String,
    pub response_mode: ResponseMode,
    pub temperature: f64,
}

impl ChatRequest {
    /// Deterministic request asking for a JSON object answer.
    pub fn json_object(
        system_persona: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            system_persona: system_persona.into(),
            prompt: prompt.into(),
            model: model.into(),
            response_mode: ResponseMode::JsonObject,
            temperature: 0.0,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl LlmError {
    /// Timeouts, connection failures, rate limits and server errors may
    /// succeed on a later attempt. Client errors and undecodable bodies won't.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Decode(_) => false,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the first choice's message content, or `None` when the
    /// provider answered without one.
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, LlmError>;
}

/// Client for any `/v1/chat/completions` endpoint (Groq, OpenAI, Ollama).
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(config.effective_base_url(), config.api_key.clone(), config.timeout_secs)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn transport_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Request(error.to_string())
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    temperature: f64,
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, LlmError> {
        let body = CompletionRequest {
            model: &request.model,
            messages: [
                CompletionMessage { role: "system", content: &request.system_persona },
                CompletionMessage { role: "user", content: &request.prompt },
            ],
            response_format: match request.response_mode {
                ResponseMode::JsonObject => Some(ResponseFormat { kind: "json_object" }),
                ResponseMode::Text => None,
            },
            temperature: request.temperature,
        };

        let mut builder = self.http.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::Decode(e.to_string())
            }
        })?;

        Ok(completion.choices.into_iter().next().and_then(|choice| choice.message.content))
    }
}

type ScriptedReply = Result<Option<String>, LlmError>;

/// In-process client that replays canned replies in order and records
/// every request it receives. Once the script runs out, the `repeat`
/// reply (if any) is returned for every further call.
#[derive(Default)]
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<ScriptedReply>>,
    repeat: Option<ScriptedReply>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self { script: Mutex::new(replies.into()), repeat: None, requests: Mutex::default() }
    }

    /// Answers every call with the same content.
    pub fn always(content: impl Into<String>) -> Self {
        Self { repeat: Some(Ok(Some(content.into()))), ..Self::default() }
    }

    pub fn always_failing(error: LlmError) -> Self {
        Self { repeat: Some(Err(error)), ..Self::default() }
    }

    pub fn replying(contents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(contents.into_iter().map(|content| Ok(Some(content.into()))).collect())
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let next = self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).pop_front();
        match (next, &self.repeat) {
            (Some(reply), _) => reply,
            (None, Some(reply)) => reply.clone(),
            (None, None) => Err(LlmError::Request("scripted replies exhausted".to_string())),
        }
    }
}
