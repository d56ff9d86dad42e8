use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl LeadId {
    /// Identifier for the row at `index` (0-based) of an uploaded lead sheet.
    pub fn for_row(index: usize) -> Self {
        Self(format!("lead_{index}"))
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lead as handed to the qualification pipeline. Fields are fixed at
/// construction; missing values are normalized to empty text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadInput {
    company_name: String,
    description: String,
    lead_id: LeadId,
}

impl LeadInput {
    pub fn new(
        company_name: impl Into<String>,
        description: impl Into<String>,
        lead_id: LeadId,
    ) -> Self {
        Self { company_name: company_name.into(), description: description.into(), lead_id }
    }

    pub fn from_row(
        company_name: Option<String>,
        description: Option<String>,
        lead_id: LeadId,
    ) -> Self {
        Self::new(company_name.unwrap_or_default(), description.unwrap_or_default(), lead_id)
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn lead_id(&self) -> &LeadId {
        &self.lead_id
    }
}
