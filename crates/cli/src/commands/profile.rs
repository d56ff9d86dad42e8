use chrono::{DateTime, Utc};
use luminova_core::config::{AppConfig, LoadOptions, ValidationScope};
use luminova_core::domain::profile::{UserId, UserProfile};
use luminova_core::errors::ApplicationError;
use luminova_db::repositories::{open_profile_store, ProfileStore};
use serde::Serialize;

use crate::commands::{build_runtime, load_config, to_data, CommandResult};

const COMMAND: &str = "profile";

#[derive(Debug, Serialize)]
struct RecentInteraction<'a> {
    lead_id: &'a str,
    company: &'a str,
    qualified_status: String,
    priority_score: u8,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ProfileStats<'a> {
    user_id: &'a str,
    total_interactions: usize,
    created_at: DateTime<Utc>,
    recent: Vec<RecentInteraction<'a>>,
}

pub fn run(options: LoadOptions, recent: usize) -> CommandResult {
    let options = LoadOptions { scope: ValidationScope::Storage, ..options };
    match load_config(options).and_then(|config| execute(&config, recent)) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

/// Reports the stored history of the configured user. Unlike lead
/// processing this reads the store directly, so an unreachable store is an
/// error here rather than a silent fallback.
pub fn execute(config: &AppConfig, recent: usize) -> Result<CommandResult, ApplicationError> {
    let user_id = config.profile.user_id.clone().map(UserId).ok_or_else(|| {
        ApplicationError::Input(
            "profile.user_id is required (pass --user-id or set LUMINOVA_USER_ID)".to_string(),
        )
    })?;
    if !config.profile.persist {
        return Err(ApplicationError::Input(
            "profile.persist is false, there is no stored profile to inspect".to_string(),
        ));
    }

    let runtime = build_runtime()?;
    let profile = runtime.block_on(async {
        let store = open_profile_store(&config.database).await?;
        let profile = store.get_profile(&user_id).await;
        store.pool().close().await;
        profile
    });
    let profile =
        profile.map_err(|error| ApplicationError::Persistence(format!("profile store: {error}")))?;

    let stats = stats(&user_id, &profile, recent);
    let message = format!(
        "user {} has {} recorded interactions",
        stats.user_id, stats.total_interactions
    );
    Ok(CommandResult::success_with_data(COMMAND, message, Some(to_data(&stats)?)))
}

fn stats<'a>(user_id: &'a UserId, profile: &'a UserProfile, recent: usize) -> ProfileStats<'a> {
    ProfileStats {
        user_id: &user_id.0,
        total_interactions: profile.interaction_count(),
        created_at: profile.created_at,
        recent: profile
            .recent(recent)
            .map(|record| RecentInteraction {
                lead_id: &record.lead_id.0,
                company: &record.company,
                qualified_status: record.qualification.qualified_status.to_string(),
                priority_score: record.qualification.priority_score.value(),
                timestamp: record.timestamp,
            })
            .collect(),
    }
}
