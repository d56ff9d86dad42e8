use serde_json::{Map, Value};

use luminova_core::domain::lead::LeadId;
use luminova_core::domain::qualification::{
    PriorityScore, QualificationResult, QualificationStatus,
};

pub const FIELD_STATUS: &str = "qualified_status";
pub const FIELD_SCORE: &str = "priority_score";
pub const FIELD_REASONING: &str = "reasoning";

pub const DEFAULT_REASONING: &str = "No reasoning provided.";

/// Coerces a parsed reply into a result. Never fails and never yields the
/// `Error` status.
///
/// - `qualified_status`: strings go through label matching; other JSON values
///   are kept as their JSON text; absent is `Unspecified`.
/// - `priority_score`: integers, finite floats (truncated) and numeric strings
///   are accepted; anything else is 0. The value is then clamped into `0..=5`.
/// - `reasoning`: strings pass through; other JSON values become their JSON
///   text; absent is `DEFAULT_REASONING`.
pub fn validate(lead_id: LeadId, mapping: &Map<String, Value>) -> QualificationResult {
    QualificationResult {
        lead_id,
        qualified_status: coerce_status(mapping.get(FIELD_STATUS)),
        priority_score: coerce_score(mapping.get(FIELD_SCORE)),
        reasoning: coerce_reasoning(mapping.get(FIELD_REASONING)),
    }
}

fn coerce_status(value: Option<&Value>) -> QualificationStatus {
    match value {
        None => QualificationStatus::Unspecified,
        Some(Value::String(label)) => QualificationStatus::from_model_label(label),
        Some(other) => QualificationStatus::Unrecognized(other.to_string()),
    }
}

fn coerce_score(value: Option<&Value>) -> PriorityScore {
    let raw = match value {
        Some(Value::Number(number)) => number_to_i64(number),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    PriorityScore::clamped(raw.unwrap_or(0))
}

fn number_to_i64(number: &serde_json::Number) -> Option<i64> {
    if let Some(value) = number.as_i64() {
        return Some(value);
    }
    if number.is_u64() {
        return Some(i64::MAX);
    }
    number.as_f64().filter(|value| value.is_finite()).map(|value| value.trunc() as i64)
}

fn coerce_reasoning(value: Option<&Value>) -> String {
    match value {
        None => DEFAULT_REASONING.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
