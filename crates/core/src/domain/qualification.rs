use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadId;
use crate::errors::QualificationFailure;

pub const STATUS_LABEL_HIGH_FIT: &str = "High Fit";
pub const STATUS_LABEL_MEDIUM_FIT: &str = "Medium Fit";
pub const STATUS_LABEL_LOW_FIT: &str = "Low Fit";
pub const STATUS_LABEL_NOT_FIT: &str = "Not Fit";
pub const STATUS_LABEL_ERROR: &str = "Error";
pub const STATUS_LABEL_UNSPECIFIED: &str = "N/A";

/// Outcome tier of a qualified lead.
///
/// `Error` is reserved for leads where no structured answer could be obtained
/// from the model. Labels the model invents are preserved verbatim in
/// `Unrecognized`, and a missing label is `Unspecified`.
///
/// Stored form is the plain label, except `Unrecognized`, which is written as
/// `{"unrecognized": "<text>"}` so an invented "Error" or "N/A" cannot reload
/// as a reserved status.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "StoredStatus", into = "StoredStatus")]
pub enum QualificationStatus {
    HighFit,
    MediumFit,
    LowFit,
    NotFit,
    Error,
    Unspecified,
    Unrecognized(String),
}

impl QualificationStatus {
    /// Maps a label produced by the model. Matching ignores case, spaces,
    /// underscores and hyphens. Never yields `Error`.
    pub fn from_model_label(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "highfit" => Self::HighFit,
            "mediumfit" => Self::MediumFit,
            "lowfit" => Self::LowFit,
            "notfit" => Self::NotFit,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::HighFit => STATUS_LABEL_HIGH_FIT,
            Self::MediumFit => STATUS_LABEL_MEDIUM_FIT,
            Self::LowFit => STATUS_LABEL_LOW_FIT,
            Self::NotFit => STATUS_LABEL_NOT_FIT,
            Self::Error => STATUS_LABEL_ERROR,
            Self::Unspecified => STATUS_LABEL_UNSPECIFIED,
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for QualificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for QualificationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            STATUS_LABEL_ERROR => Self::Error,
            STATUS_LABEL_UNSPECIFIED => Self::Unspecified,
            _ => Self::from_model_label(&value),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredStatus {
    Label(String),
    Unrecognized { unrecognized: String },
}

impl From<StoredStatus> for QualificationStatus {
    fn from(value: StoredStatus) -> Self {
        match value {
            StoredStatus::Label(label) => Self::from(label),
            StoredStatus::Unrecognized { unrecognized } => Self::Unrecognized(unrecognized),
        }
    }
}

impl From<QualificationStatus> for StoredStatus {
    fn from(value: QualificationStatus) -> Self {
        match value {
            QualificationStatus::Unrecognized(raw) => Self::Unrecognized { unrecognized: raw },
            other => Self::Label(other.label().to_string()),
        }
    }
}

/// Outreach priority, always within `0..=5`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct PriorityScore(u8);

impl PriorityScore {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 5;

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u8)
    }

    pub fn zero() -> Self {
        Self(Self::MIN)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<i64> for PriorityScore {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<PriorityScore> for u8 {
    fn from(value: PriorityScore) -> Self {
        value.0
    }
}

impl fmt::Display for PriorityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub lead_id: LeadId,
    pub qualified_status: QualificationStatus,
    pub priority_score: PriorityScore,
    pub reasoning: String,
}

impl QualificationResult {
    /// Result recorded when the model produced nothing usable for the lead.
    pub fn failed(lead_id: LeadId, failure: &QualificationFailure) -> Self {
        Self {
            lead_id,
            qualified_status: QualificationStatus::Error,
            priority_score: PriorityScore::zero(),
            reasoning: failure.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.qualified_status.is_error()
    }
}
