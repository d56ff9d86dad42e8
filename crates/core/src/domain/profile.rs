use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::lead::{LeadId, LeadInput};
use crate::domain::qualification::QualificationResult;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub lead_id: LeadId,
    pub company: String,
    pub description: String,
    #[serde(alias = "analysis")]
    pub qualification: QualificationResult,
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn new(lead: &LeadInput, qualification: QualificationResult) -> Self {
        Self::recorded_at(lead, qualification, Utc::now())
    }

    pub fn recorded_at(
        lead: &LeadInput,
        qualification: QualificationResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            lead_id: lead.lead_id().clone(),
            company: lead.company_name().to_string(),
            description: lead.description().to_string(),
            qualification,
            timestamp,
        }
    }
}

/// Append-only history of the leads a user has processed.
///
/// `preferences` is carried as an opaque document; nothing in the
/// qualification flow reads or writes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub past_interactions: Vec<InteractionRecord>,
    #[serde(default)]
    pub preferences: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::created_at(Utc::now())
    }

    pub fn created_at(created_at: DateTime<Utc>) -> Self {
        Self { past_interactions: Vec::new(), preferences: Map::new(), created_at }
    }

    pub fn append(&mut self, record: InteractionRecord) {
        self.past_interactions.push(record);
    }

    pub fn interaction_count(&self) -> usize {
        self.past_interactions.len()
    }

    /// Most recent interactions first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &InteractionRecord> {
        self.past_interactions.iter().rev().take(limit)
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new()
    }
}
