use async_trait::async_trait;
use thiserror::Error;

use luminova_core::domain::profile::{InteractionRecord, UserId, UserProfile};

pub mod memory;
pub mod profile;

pub use memory::InMemoryProfileStore;
pub use profile::{open_profile_store, SqlProfileStore};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

/// Per-user interaction history.
///
/// `get_profile` creates an empty profile on first access. `put_profile`
/// replaces the whole document, so a read-modify-write through these two
/// calls is last-write-wins when two writers share a user id;
/// `append_interaction` appends in a single step.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile, RepositoryError>;

    async fn put_profile(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<(), RepositoryError>;

    async fn append_interaction(
        &self,
        user_id: &UserId,
        record: &InteractionRecord,
    ) -> Result<(), RepositoryError>;
}
