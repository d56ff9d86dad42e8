use std::collections::HashMap;

use tokio::sync::RwLock;

use luminova_core::domain::profile::{InteractionRecord, UserId, UserProfile};

use super::{ProfileStore, RepositoryError};

/// Process-local profile store. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfileStore {
    /// Starts with `profile` already stored for `user_id`.
    pub fn with_profile(user_id: &UserId, profile: UserProfile) -> Self {
        let profiles = HashMap::from([(user_id.0.clone(), profile)]);
        Self { profiles: RwLock::new(profiles) }
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile, RepositoryError> {
        if let Some(profile) = self.profiles.read().await.get(&user_id.0) {
            return Ok(profile.clone());
        }

        let mut profiles = self.profiles.write().await;
        Ok(profiles.entry(user_id.0.clone()).or_default().clone())
    }

    async fn put_profile(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(user_id.0.clone(), profile.clone());
        Ok(())
    }

    async fn append_interaction(
        &self,
        user_id: &UserId,
        record: &InteractionRecord,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        profiles.entry(user_id.0.clone()).or_default().append(record.clone());
        Ok(())
    }
}
