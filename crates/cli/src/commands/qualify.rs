use std::sync::Arc;

use luminova_agent::llm::LlmClient;
use luminova_agent::pipeline::QualificationPipeline;
use luminova_agent::runtime::{LeadProcessor, ProfileSession};
use luminova_core::config::{AppConfig, LoadOptions};
use luminova_core::domain::lead::LeadId;
use luminova_core::errors::ApplicationError;

use crate::commands::{build_llm_client, build_runtime, load_config, to_data, CommandResult};

const COMMAND: &str = "qualify";

pub fn run(options: LoadOptions, company: &str, description: &str, lead_id: &str) -> CommandResult {
    let outcome = load_config(options).and_then(|config| {
        let client = build_llm_client(&config)?;
        execute(&config, client, company, description, lead_id)
    });

    match outcome {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

/// Qualifies one lead and records it on the configured profile. A lead the
/// model could not qualify is still a successful command: its result carries
/// the `Error` status.
pub fn execute(
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
    company: &str,
    description: &str,
    lead_id: &str,
) -> Result<CommandResult, ApplicationError> {
    let runtime = build_runtime()?;

    let result = runtime.block_on(async {
        let session = ProfileSession::from_config(&config.database, &config.profile).await;
        let mut processor =
            LeadProcessor::new(QualificationPipeline::from_config(client, &config.llm), session);
        processor.process_lead(company, description, LeadId(lead_id.to_string())).await
    });

    let message = format!(
        "{} qualified as {} (priority {})",
        if company.is_empty() { "lead" } else { company },
        result.qualified_status,
        result.priority_score
    );
    Ok(CommandResult::success_with_data(COMMAND, message, Some(to_data(&result)?)))
}
