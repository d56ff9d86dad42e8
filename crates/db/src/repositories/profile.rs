use chrono::Utc;
use sqlx::Row;

use luminova_core::config::DatabaseConfig;
use luminova_core::domain::profile::{InteractionRecord, UserId, UserProfile};

use super::{ProfileStore, RepositoryError};
use crate::{connection, migrations, DbPool};

/// Profiles stored as one JSON document per user in `user_profile`.
pub struct SqlProfileStore {
    pool: DbPool,
}

impl SqlProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn find_document(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM user_profile WHERE user_id = ?")
            .bind(&user_id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => {
                let document: String =
                    r.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Some(decode_profile(&document)?))
            }
            None => Ok(None),
        }
    }
}

/// Connects to the configured database and applies pending migrations.
pub async fn open_profile_store(config: &DatabaseConfig) -> Result<SqlProfileStore, RepositoryError> {
    let pool = connection::connect(config).await?;
    migrations::run_pending(&pool).await?;
    Ok(SqlProfileStore::new(pool))
}

fn encode_profile(profile: &UserProfile) -> Result<String, RepositoryError> {
    serde_json::to_string(profile).map_err(|e| RepositoryError::Encode(e.to_string()))
}

fn decode_profile(document: &str) -> Result<UserProfile, RepositoryError> {
    serde_json::from_str(document).map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl ProfileStore for SqlProfileStore {
    async fn get_profile(&self, user_id: &UserId) -> Result<UserProfile, RepositoryError> {
        if let Some(profile) = self.find_document(user_id).await? {
            return Ok(profile);
        }

        let fresh = UserProfile::new();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO user_profile (user_id, document, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(&user_id.0)
        .bind(encode_profile(&fresh)?)
        .bind(fresh.created_at.to_rfc3339())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        // Another writer may have created the row between the read and the insert.
        self.find_document(user_id)
            .await?
            .ok_or_else(|| RepositoryError::Decode(format!("profile `{user_id}` vanished after create")))
    }

    async fn put_profile(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_profile (user_id, document, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 document = excluded.document,
                 updated_at = excluded.updated_at",
        )
        .bind(&user_id.0)
        .bind(encode_profile(profile)?)
        .bind(profile.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_interaction(
        &self,
        user_id: &UserId,
        record: &InteractionRecord,
    ) -> Result<(), RepositoryError> {
        self.get_profile(user_id).await?;

        let encoded = serde_json::to_string(record).map_err(|e| RepositoryError::Encode(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE user_profile
             SET document = json_insert(document, '$.past_interactions[#]', json(?)),
                 updated_at = ?
             WHERE user_id = ?",
        )
        .bind(encoded)
        .bind(Utc::now().to_rfc3339())
        .bind(&user_id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Err(RepositoryError::Decode(format!(
                "append for profile `{user_id}` touched {} rows",
                result.rows_affected()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use luminova_core::config::DatabaseConfig;
    use luminova_core::domain::lead::{LeadId, LeadInput};
    use luminova_core::domain::profile::{InteractionRecord, UserId, UserProfile};
    use luminova_core::domain::qualification::{
        PriorityScore, QualificationResult, QualificationStatus,
    };
    use serde_json::json;
    use tempfile::TempDir;

    use super::open_profile_store;
    use crate::repositories::{ProfileStore, SqlProfileStore};

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig { url: "sqlite::memory:".to_string(), max_connections: 1, timeout_secs: 5 }
    }

    fn record(index: usize, status: QualificationStatus, score: i64) -> InteractionRecord {
        let lead = LeadInput::new(format!("Company {index}"), "Enterprise SaaS", LeadId::for_row(index));
        InteractionRecord::recorded_at(
            &lead,
            QualificationResult {
                lead_id: LeadId::for_row(index),
                qualified_status: status,
                priority_score: PriorityScore::clamped(score),
                reasoning: "Mentions cloud workloads.".to_string(),
            },
            Utc.with_ymd_and_hms(2025, 3, 1, 10, index as u32, 0).single().expect("timestamp"),
        )
    }

    async fn store() -> SqlProfileStore {
        open_profile_store(&memory_config()).await.expect("open profile store")
    }

    #[tokio::test]
    async fn get_profile_creates_and_persists_empty_profile() {
        let store = store().await;
        let user = UserId("user-a".to_string());

        let created = store.get_profile(&user).await.expect("create profile");
        let reloaded = store.get_profile(&user).await.expect("reload profile");

        assert_eq!(created.interaction_count(), 0);
        assert_eq!(created, reloaded);
    }

    #[tokio::test]
    async fn put_profile_overwrites_whole_document() {
        let store = store().await;
        let user = UserId("user-b".to_string());

        let mut profile = store.get_profile(&user).await.expect("create profile");
        profile.append(record(0, QualificationStatus::HighFit, 5));
        profile.preferences.insert("region".to_string(), json!("emea"));
        store.put_profile(&user, &profile).await.expect("put profile");

        let replacement = UserProfile::created_at(profile.created_at);
        store.put_profile(&user, &replacement).await.expect("overwrite profile");

        let found = store.get_profile(&user).await.expect("reload");
        assert_eq!(found, replacement);
    }

    #[tokio::test]
    async fn read_modify_write_grows_history_by_batch_size() {
        let store = store().await;
        let user = UserId("user-c".to_string());

        let before = store.get_profile(&user).await.expect("create").interaction_count();
        for index in 0..3 {
            let mut profile = store.get_profile(&user).await.expect("read");
            profile.append(record(index, QualificationStatus::LowFit, 1));
            store.put_profile(&user, &profile).await.expect("write");
        }

        let after = store.get_profile(&user).await.expect("reload");
        assert_eq!(after.interaction_count(), before + 3);
        let ids: Vec<_> = after.past_interactions.iter().map(|r| r.lead_id.0.clone()).collect();
        assert_eq!(ids, vec!["lead_0", "lead_1", "lead_2"]);
    }

    #[tokio::test]
    async fn append_interaction_is_single_statement_and_ordered() {
        let store = store().await;
        let user = UserId("user-d".to_string());

        store
            .append_interaction(&user, &record(0, QualificationStatus::NotFit, 0))
            .await
            .expect("append first");
        store
            .append_interaction(&user, &record(1, QualificationStatus::Error, 0))
            .await
            .expect("append second");

        let profile = store.get_profile(&user).await.expect("reload");
        assert_eq!(profile.interaction_count(), 2);
        assert_eq!(profile.past_interactions[0].qualification.qualified_status, QualificationStatus::NotFit);
        assert_eq!(profile.past_interactions[1].qualification.qualified_status, QualificationStatus::Error);
    }

    #[tokio::test]
    async fn invented_reserved_labels_reload_unchanged() {
        let store = store().await;
        let user = UserId("user-f".to_string());

        let mut profile = store.get_profile(&user).await.expect("create");
        profile.append(record(0, QualificationStatus::from_model_label("Error"), 3));
        store.put_profile(&user, &profile).await.expect("put");
        store
            .append_interaction(&user, &record(1, QualificationStatus::from_model_label("N/A"), 2))
            .await
            .expect("append");

        let reloaded = store.get_profile(&user).await.expect("reload");
        let first = &reloaded.past_interactions[0].qualification;
        assert_eq!(first.qualified_status, QualificationStatus::Unrecognized("Error".to_string()));
        assert!(!first.is_error());
        assert_eq!(first.priority_score.value(), 3);
        assert_eq!(
            reloaded.past_interactions[1].qualification.qualified_status,
            QualificationStatus::Unrecognized("N/A".to_string())
        );
    }

    #[tokio::test]
    async fn profiles_survive_reopening_a_file_database() {
        let dir = TempDir::new().expect("tempdir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("profiles.db").display());
        let config = DatabaseConfig { url, max_connections: 2, timeout_secs: 5 };
        let user = UserId("user-e".to_string());

        {
            let store = open_profile_store(&config).await.expect("open store");
            store
                .append_interaction(&user, &record(0, QualificationStatus::MediumFit, 3))
                .await
                .expect("append");
            store.pool().close().await;
        }

        let reopened = open_profile_store(&config).await.expect("reopen store");
        let profile = reopened.get_profile(&user).await.expect("reload");
        assert_eq!(profile.interaction_count(), 1);
        assert_eq!(profile.past_interactions[0].qualification.priority_score.value(), 3);
    }
}
