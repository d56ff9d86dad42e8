use serde_json::{Map, Value};
use thiserror::Error;

use luminova_core::errors::QualificationFailure;

/// Raw model text kept in diagnostics is cut to this many characters.
pub const RAW_EXCERPT_LIMIT: usize = 500;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("model response is not a JSON object: {message}")]
    MalformedJson { message: String, raw: String },
}

impl From<ParseFailure> for QualificationFailure {
    fn from(value: ParseFailure) -> Self {
        match value {
            ParseFailure::EmptyResponse => Self::EmptyResponse,
            ParseFailure::MalformedJson { message, raw } => Self::MalformedJson { message, raw },
        }
    }
}

/// Strict parse of the model's reply into an untyped mapping.
///
/// Absent or whitespace-only text is `EmptyResponse`. Anything that is not a
/// JSON object (including valid JSON arrays or scalars) is `MalformedJson`.
/// Near-JSON such as fenced blocks is not repaired.
pub fn parse_response(raw: Option<&str>) -> Result<Map<String, Value>, ParseFailure> {
    let text = match raw {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(ParseFailure::EmptyResponse),
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mapping)) => Ok(mapping),
        Ok(other) => Err(ParseFailure::MalformedJson {
            message: format!("expected a JSON object, found {}", json_kind(&other)),
            raw: excerpt(text),
        }),
        Err(error) => {
            Err(ParseFailure::MalformedJson { message: error.to_string(), raw: excerpt(text) })
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(RAW_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
