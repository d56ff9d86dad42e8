pub mod batch;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod profile;
pub mod qualify;

use std::sync::Arc;

use luminova_agent::llm::{LlmClient, OpenAiCompatibleClient};
use luminova_core::config::{AppConfig, LoadOptions};
use luminova_core::errors::ApplicationError;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(options: LoadOptions) -> Result<AppConfig, ApplicationError> {
    AppConfig::load(options).map_err(ApplicationError::from)
}

pub(crate) fn build_runtime() -> Result<Runtime, ApplicationError> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        ApplicationError::RuntimeInit(format!("failed to initialize async runtime: {error}"))
    })
}

pub(crate) fn build_llm_client(config: &AppConfig) -> Result<Arc<dyn LlmClient>, ApplicationError> {
    let client = OpenAiCompatibleClient::from_config(&config.llm).map_err(|error| {
        ApplicationError::RuntimeInit(format!("failed to build model client: {error}"))
    })?;
    Ok(Arc::new(client))
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Value, ApplicationError> {
    serde_json::to_value(value)
        .map_err(|error| ApplicationError::Output(format!("failed to serialize output: {error}")))
}
