pub mod config;
pub mod domain;
pub mod errors;

pub use domain::lead::{LeadId, LeadInput};
pub use domain::profile::{InteractionRecord, UserId, UserProfile};
pub use domain::qualification::{PriorityScore, QualificationResult, QualificationStatus};
pub use errors::{ApplicationError, QualificationFailure};
