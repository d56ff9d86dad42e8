use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{info, warn};

use luminova_core::config::{DatabaseConfig, ProfileConfig};
use luminova_core::domain::lead::{LeadId, LeadInput};
use luminova_core::domain::profile::{InteractionRecord, UserId, UserProfile};
use luminova_core::domain::qualification::{
    PriorityScore, QualificationResult, QualificationStatus,
};
use luminova_db::repositories::{open_profile_store, InMemoryProfileStore, ProfileStore};

use crate::pipeline::QualificationPipeline;

/// The profile of the user running a session, plus the store it came from.
///
/// When the configured store cannot be read at open time the session
/// switches to a process-local store for the rest of the run. Write failures
/// are logged and otherwise ignored; qualification never waits on them.
pub struct ProfileSession {
    store: Arc<dyn ProfileStore>,
    user_id: UserId,
    profile: UserProfile,
    degraded: bool,
}

impl ProfileSession {
    pub async fn open(store: Arc<dyn ProfileStore>, user_id: UserId) -> Self {
        match store.get_profile(&user_id).await {
            Ok(profile) => Self { store, user_id, profile, degraded: false },
            Err(error) => {
                warn!(
                    event_name = "profile.store.degraded",
                    user_id = %user_id,
                    error = %error,
                    "profile store unavailable, continuing with an in-memory profile"
                );
                Self::degraded(user_id)
            }
        }
    }

    /// Opens the session described by configuration. With `persist = false`
    /// the profile lives in memory only; an unreachable database degrades the
    /// same way but is reported.
    pub async fn from_config(database: &DatabaseConfig, profile: &ProfileConfig) -> Self {
        let user_id = profile.resolve_user_id();
        if !profile.persist {
            return Self::in_memory(user_id);
        }

        match open_profile_store(database).await {
            Ok(store) => Self::open(Arc::new(store), user_id).await,
            Err(error) => {
                warn!(
                    event_name = "profile.store.degraded",
                    user_id = %user_id,
                    error = %error,
                    "could not open profile store, continuing with an in-memory profile"
                );
                Self::degraded(user_id)
            }
        }
    }

    /// A session backed only by process memory.
    pub fn in_memory(user_id: UserId) -> Self {
        let profile = UserProfile::new();
        Self {
            store: Arc::new(InMemoryProfileStore::with_profile(&user_id, profile.clone())),
            user_id,
            profile,
            degraded: false,
        }
    }

    fn degraded(user_id: UserId) -> Self {
        Self { degraded: true, ..Self::in_memory(user_id) }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Read-modify-write: reload the stored profile, append, write it back.
    /// With two writers on one user id the last write wins.
    async fn record(&mut self, record: InteractionRecord) {
        let mut profile = match self.store.get_profile(&self.user_id).await {
            Ok(profile) => profile,
            Err(error) => {
                warn!(
                    event_name = "profile.persist.failed",
                    user_id = %self.user_id,
                    lead_id = %record.lead_id,
                    error = %error,
                    "could not reload profile, appending to the session copy"
                );
                self.profile.clone()
            }
        };
        profile.append(record);

        if let Err(error) = self.store.put_profile(&self.user_id, &profile).await {
            warn!(
                event_name = "profile.persist.failed",
                user_id = %self.user_id,
                error = %error,
                "profile write failed, interaction kept in memory only"
            );
        }
        self.profile = profile;
    }
}

/// One output row, serialized with the column headers of the results sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessedLead {
    #[serde(skip)]
    pub lead_id: LeadId,
    #[serde(rename = "Original Company Name")]
    pub company_name: String,
    #[serde(rename = "Original Description")]
    pub description: String,
    #[serde(rename = "Qualified Status", serialize_with = "status_label")]
    pub qualified_status: QualificationStatus,
    #[serde(rename = "Priority Score")]
    pub priority_score: PriorityScore,
    #[serde(rename = "Reasoning")]
    pub reasoning: String,
}

fn status_label<S: Serializer>(status: &QualificationStatus, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(status)
}

impl ProcessedLead {
    pub fn new(lead: &LeadInput, result: QualificationResult) -> Self {
        Self {
            lead_id: result.lead_id,
            company_name: lead.company_name().to_string(),
            description: lead.description().to_string(),
            qualified_status: result.qualified_status,
            priority_score: result.priority_score,
            reasoning: result.reasoning,
        }
    }
}

/// Counts behind the results dashboard.
///
/// `unrecognized` covers both invented labels and a missing label.
/// `not_fit_bucket` is the dashboard's "Not Fit" tile, which also counts
/// error and unrecognized rows; `not_fit` stays the model's own verdict.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub high_fit: usize,
    pub medium_fit: usize,
    pub low_fit: usize,
    pub not_fit: usize,
    pub error: usize,
    pub unrecognized: usize,
    pub not_fit_bucket: usize,
    pub score_histogram: [usize; 6],
}

impl BatchSummary {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a ProcessedLead>) -> Self {
        let mut summary = Self::default();
        for row in rows {
            summary.add(&row.qualified_status, row.priority_score);
        }
        summary
    }

    fn add(&mut self, status: &QualificationStatus, score: PriorityScore) {
        self.total += 1;
        match status {
            QualificationStatus::HighFit => self.high_fit += 1,
            QualificationStatus::MediumFit => self.medium_fit += 1,
            QualificationStatus::LowFit => self.low_fit += 1,
            QualificationStatus::NotFit => self.not_fit += 1,
            QualificationStatus::Error => self.error += 1,
            QualificationStatus::Unspecified | QualificationStatus::Unrecognized(_) => {
                self.unrecognized += 1
            }
        }
        self.not_fit_bucket = self.not_fit + self.error + self.unrecognized;
        self.score_histogram[usize::from(score.value())] += 1;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub rows: Vec<ProcessedLead>,
    pub summary: BatchSummary,
}

/// Caller-side entry point: qualifies leads one at a time, in order, and
/// appends each outcome to the session's profile.
pub struct LeadProcessor {
    pipeline: QualificationPipeline,
    session: ProfileSession,
}

impl LeadProcessor {
    pub fn new(pipeline: QualificationPipeline, session: ProfileSession) -> Self {
        Self { pipeline, session }
    }

    pub fn session(&self) -> &ProfileSession {
        &self.session
    }

    pub async fn process_lead(
        &mut self,
        company_name: &str,
        description: &str,
        lead_id: LeadId,
    ) -> QualificationResult {
        self.process(&LeadInput::new(company_name, description, lead_id)).await
    }

    pub async fn process(&mut self, lead: &LeadInput) -> QualificationResult {
        let result = self.pipeline.qualify(lead).await;
        self.session.record(InteractionRecord::new(lead, result.clone())).await;
        result
    }

    pub async fn process_batch(&mut self, leads: &[LeadInput]) -> BatchReport {
        let mut rows = Vec::with_capacity(leads.len());
        for lead in leads {
            let result = self.process(lead).await;
            rows.push(ProcessedLead::new(lead, result));
        }

        let summary = BatchSummary::from_rows(&rows);
        info!(
            event_name = "batch.completed",
            user_id = %self.session.user_id(),
            total = summary.total,
            high_fit = summary.high_fit,
            medium_fit = summary.medium_fit,
            low_fit = summary.low_fit,
            not_fit_bucket = summary.not_fit_bucket,
            errors = summary.error,
            "lead batch processed"
        );

        BatchReport { rows, summary }
    }
}
