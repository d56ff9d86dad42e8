use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use luminova_core::config::LlmConfig;
use luminova_core::domain::lead::{LeadId, LeadInput};
use luminova_core::domain::qualification::QualificationResult;
use luminova_core::errors::QualificationFailure;

use crate::llm::{ChatRequest, LlmClient, LlmError};
use crate::parser::parse_response;
use crate::prompt::PromptBuilder;
use crate::validator::validate;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Extra attempts for retryable transport failures, with doubling delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_retries: 0, initial_backoff: Duration::ZERO }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Prompt, model call, parse and validation for one lead at a time.
///
/// `qualify` never fails: transport and parse failures come back as an
/// `Error` result with score 0 and a diagnostic reasoning. The pipeline does
/// not touch the profile store.
pub struct QualificationPipeline {
    client: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    model: String,
    retry: RetryPolicy,
}

impl QualificationPipeline {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self { client, prompts: PromptBuilder::new(), model: model.into(), retry: RetryPolicy::none() }
    }

    pub fn from_config(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self::new(client, config.model.clone()).with_retry_policy(RetryPolicy::from_config(config))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn qualify(&self, lead: &LeadInput) -> QualificationResult {
        match self.try_qualify(lead).await {
            Ok(result) => {
                info!(
                    event_name = "lead.qualification.completed",
                    lead_id = %lead.lead_id(),
                    qualified_status = %result.qualified_status,
                    priority_score = result.priority_score.value(),
                    "lead qualified"
                );
                result
            }
            Err(failure) => {
                warn!(
                    event_name = "lead.qualification.failed",
                    lead_id = %lead.lead_id(),
                    failure_kind = failure.kind(),
                    error = %failure,
                    "lead qualification fell back to error result"
                );
                QualificationResult::failed(lead.lead_id().clone(), &failure)
            }
        }
    }

    async fn try_qualify(&self, lead: &LeadInput) -> Result<QualificationResult, QualificationFailure> {
        let prompt = self.prompts.render(lead.company_name(), lead.description());
        let request = ChatRequest::json_object(prompt.system_persona, prompt.text, &self.model);

        let reply = self
            .invoke(&request, lead.lead_id())
            .await
            .map_err(|error| QualificationFailure::Transport(error.to_string()))?;

        let mapping = parse_response(reply.as_deref())?;
        Ok(validate(lead.lead_id().clone(), &mapping))
    }

    async fn invoke(&self, request: &ChatRequest, lead_id: &LeadId) -> Result<Option<String>, LlmError> {
        let mut attempt = 0;
        loop {
            match self.client.complete(request).await {
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        event_name = "lead.llm.retry",
                        lead_id = %lead_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying model call"
                    );
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}
