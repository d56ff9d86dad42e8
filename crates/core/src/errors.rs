use thiserror::Error;

use crate::config::ConfigError;

/// Why a single lead could not be qualified. The display text becomes the
/// `reasoning` of the lead's `Error` result.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QualificationFailure {
    #[error("AI processing failed: the model returned an empty response.")]
    EmptyResponse,
    #[error("AI response was not valid JSON: {message}. Raw response: {raw}")]
    MalformedJson { message: String, raw: String },
    #[error("AI processing failed due to API error: {0}")]
    Transport(String),
}

impl QualificationFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyResponse => "empty_response",
            Self::MalformedJson { .. } => "malformed_json",
            Self::Transport(_) => "transport_failure",
        }
    }
}

/// Failures that end a command instead of degrading a single lead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("runtime initialization failure: {0}")]
    RuntimeInit(String),
    #[error("input failure: {0}")]
    Input(String),
    #[error("output failure: {0}")]
    Output(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config_validation",
            Self::RuntimeInit(_) => "runtime_init",
            Self::Input(_) => "input",
            Self::Output(_) => "output",
            Self::Persistence(_) => "persistence",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::RuntimeInit(_) => 3,
            Self::Input(_) => 4,
            Self::Output(_) => 5,
            Self::Persistence(_) => 6,
        }
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, QualificationFailure};

    #[test]
    fn malformed_json_diagnostic_keeps_raw_text() {
        let failure = QualificationFailure::MalformedJson {
            message: "expected value at line 1 column 1".to_owned(),
            raw: "not json".to_owned(),
        };

        let text = failure.to_string();
        assert!(text.starts_with("AI response was not valid JSON"));
        assert!(text.contains("Raw response: not json"));
        assert_eq!(failure.kind(), "malformed_json");
    }

    #[test]
    fn failure_kinds_are_distinct() {
        assert_eq!(QualificationFailure::EmptyResponse.kind(), "empty_response");
        assert_eq!(QualificationFailure::Transport("429".to_owned()).kind(), "transport_failure");
    }

    #[test]
    fn config_errors_map_to_configuration_class() {
        let error = ApplicationError::from(ConfigError::Validation(
            "llm.api_key is required for groq/openai providers".to_owned(),
        ));

        assert_eq!(error.error_class(), "config_validation");
        assert_eq!(error.exit_code(), 2);
        assert!(error.to_string().contains("llm.api_key"));
    }

    #[test]
    fn persistence_and_input_have_their_own_exit_codes() {
        assert_eq!(ApplicationError::Input("missing column".to_owned()).exit_code(), 4);
        assert_eq!(ApplicationError::Persistence("locked".to_owned()).exit_code(), 6);
    }
}
