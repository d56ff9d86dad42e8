use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use luminova_agent::llm::LlmClient;
use luminova_agent::pipeline::QualificationPipeline;
use luminova_agent::runtime::{BatchSummary, LeadProcessor, ProcessedLead, ProfileSession};
use luminova_core::config::{AppConfig, LoadOptions};
use luminova_core::domain::lead::{LeadId, LeadInput};
use luminova_core::errors::ApplicationError;
use serde::{Deserialize, Serialize};

use crate::commands::{build_llm_client, build_runtime, load_config, to_data, CommandResult};

const COMMAND: &str = "batch";

pub const INPUT_COMPANY_COLUMN: &str = "Company Name";
pub const INPUT_DESCRIPTION_COLUMN: &str = "Description";

pub const OUTPUT_COLUMNS: [&str; 5] =
    ["Original Company Name", "Original Description", "Qualified Status", "Priority Score", "Reasoning"];

#[derive(Debug, Deserialize)]
struct LeadRow {
    #[serde(rename = "Company Name", default)]
    company_name: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchOutput<'a> {
    output_path: String,
    user_id: &'a str,
    profile_persisted: bool,
    summary: &'a BatchSummary,
}

pub fn run(options: LoadOptions, input: &Path, output: Option<&Path>) -> CommandResult {
    let outcome = load_config(options).and_then(|config| {
        let client = build_llm_client(&config)?;
        execute(&config, client, input, output)
    });

    match outcome {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

/// Reads the lead sheet, qualifies every row in order and writes the results
/// sheet. The input is fully read before the first model call.
pub fn execute(
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
    input: &Path,
    output: Option<&Path>,
) -> Result<CommandResult, ApplicationError> {
    let leads = read_leads(input)?;
    let output_path =
        output.map(Path::to_path_buf).unwrap_or_else(|| default_output_path(Local::now()));
    let runtime = build_runtime()?;

    let (report, user_id, degraded) = runtime.block_on(async {
        let session = ProfileSession::from_config(&config.database, &config.profile).await;
        let mut processor =
            LeadProcessor::new(QualificationPipeline::from_config(client, &config.llm), session);
        let report = processor.process_batch(&leads).await;
        (report, processor.session().user_id().clone(), processor.session().is_degraded())
    });

    write_results(&output_path, &report.rows)?;

    let data = BatchOutput {
        output_path: output_path.display().to_string(),
        user_id: &user_id.0,
        profile_persisted: config.profile.persist && !degraded,
        summary: &report.summary,
    };
    let message = format!(
        "processed {} leads ({} high fit, {} errors) into {}",
        report.summary.total,
        report.summary.high_fit,
        report.summary.error,
        output_path.display()
    );
    Ok(CommandResult::success_with_data(COMMAND, message, Some(to_data(&data)?)))
}

pub fn default_output_path(now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("luminova_processed_leads_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

pub fn read_leads(path: &Path) -> Result<Vec<LeadInput>, ApplicationError> {
    File::open(path)
        .with_context(|| format!("could not open lead sheet `{}`", path.display()))
        .and_then(parse_leads)
        .map_err(|error| ApplicationError::Input(format!("{error:#}")))
}

/// Rows become `lead_<index>` in sheet order. Empty cells and short rows
/// become empty text.
pub fn parse_leads(reader: impl Read) -> anyhow::Result<Vec<LeadInput>> {
    let mut csv_reader =
        csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(reader);

    let headers = csv_reader.headers().context("could not read lead sheet header row")?;
    let has_column = |name: &str| headers.iter().any(|header| header == name);
    if !has_column(INPUT_COMPANY_COLUMN) || !has_column(INPUT_DESCRIPTION_COLUMN) {
        bail!(
            "lead sheet must have `{INPUT_COMPANY_COLUMN}` and `{INPUT_DESCRIPTION_COLUMN}` columns"
        );
    }

    csv_reader
        .deserialize::<LeadRow>()
        .enumerate()
        .map(|(index, row)| {
            let row = row.with_context(|| format!("could not read lead sheet row {}", index + 1))?;
            Ok(LeadInput::from_row(row.company_name, row.description, LeadId::for_row(index)))
        })
        .collect()
}

fn write_results(path: &Path, rows: &[ProcessedLead]) -> Result<(), ApplicationError> {
    File::create(path)
        .with_context(|| format!("could not create results sheet `{}`", path.display()))
        .and_then(|file| render_results(file, rows))
        .map_err(|error| ApplicationError::Output(format!("{error:#}")))
}

pub fn render_results(writer: impl Write, rows: &[ProcessedLead]) -> anyhow::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(OUTPUT_COLUMNS).context("could not write results header")?;
    for row in rows {
        csv_writer
            .serialize(row)
            .with_context(|| format!("could not write result for `{}`", row.lead_id))?;
    }
    csv_writer.flush().context("could not flush results sheet")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use luminova_agent::runtime::ProcessedLead;
    use luminova_core::domain::lead::LeadId;
    use luminova_core::domain::qualification::{PriorityScore, QualificationStatus};

    use super::{default_output_path, parse_leads, render_results};

    #[test]
    fn leads_are_read_in_order_with_row_ids() {
        let sheet = "Company Name,Description,Website\n\
                     CyberSecure Solutions,Cloud security,https://cyber.example\n\
                     Pawsitive Pet Care,Dog grooming,\n";

        let leads = parse_leads(sheet.as_bytes()).expect("parse");

        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].company_name(), "CyberSecure Solutions");
        assert_eq!(leads[0].lead_id(), &LeadId::for_row(0));
        assert_eq!(leads[1].description(), "Dog grooming");
        assert_eq!(leads[1].lead_id(), &LeadId::for_row(1));
    }

    #[test]
    fn empty_cells_and_short_rows_become_empty_text() {
        let sheet = "Description,Company Name\n,Acme\nOnly description\n";

        let leads = parse_leads(sheet.as_bytes()).expect("parse");

        assert_eq!(leads[0].company_name(), "Acme");
        assert_eq!(leads[0].description(), "");
        assert_eq!(leads[1].company_name(), "");
        assert_eq!(leads[1].description(), "Only description");
    }

    #[test]
    fn missing_columns_name_both_required_headers() {
        let error = parse_leads("Company,Notes\nAcme,Retail\n".as_bytes()).expect_err("should fail");
        let text = format!("{error:#}");

        assert!(text.contains("Company Name"));
        assert!(text.contains("Description"));
    }

    #[test]
    fn results_use_fixed_column_order() {
        let rows = vec![ProcessedLead {
            lead_id: LeadId::for_row(0),
            company_name: "Acme, Inc.".to_string(),
            description: "Cloud".to_string(),
            qualified_status: QualificationStatus::Error,
            priority_score: PriorityScore::zero(),
            reasoning: "AI processing failed due to API error: timeout".to_string(),
        }];

        let mut buffer = Vec::new();
        render_results(&mut buffer, &rows).expect("render");
        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("Original Company Name,Original Description,Qualified Status,Priority Score,Reasoning")
        );
        assert_eq!(
            lines.next(),
            Some("\"Acme, Inc.\",Cloud,Error,0,AI processing failed due to API error: timeout")
        );
    }

    #[test]
    fn empty_batches_still_get_a_header() {
        let mut buffer = Vec::new();
        render_results(&mut buffer, &[]).expect("render");
        assert_eq!(
            String::from_utf8(buffer).expect("utf8"),
            "Original Company Name,Original Description,Qualified Status,Priority Score,Reasoning\n"
        );
    }

    #[test]
    fn default_output_name_is_timestamped() {
        let now = Local.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).single().expect("timestamp");
        assert_eq!(
            default_output_path(now).to_string_lossy(),
            "luminova_processed_leads_20250301_090507.csv"
        );
    }
}
