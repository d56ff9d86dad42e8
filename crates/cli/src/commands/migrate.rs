use crate::commands::{build_runtime, load_config, CommandResult};
use luminova_core::config::{LoadOptions, ValidationScope};
use luminova_db::{connect, migrations};

const COMMAND: &str = "migrate";

/// Loads with storage-only validation; migrating never needs model credentials.
pub fn run(options: LoadOptions) -> CommandResult {
    let options = LoadOptions { scope: ValidationScope::Storage, ..options };
    let config = match load_config(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error(COMMAND, &error),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::from_error(COMMAND, &error),
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 6u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 6u8))?;
        let applied = migrations::applied_count(&pool).await.unwrap_or_default();
        pool.close().await;
        Ok::<usize, (&'static str, String, u8)>(applied)
    });

    match result {
        Ok(applied) => CommandResult::success(
            COMMAND,
            format!("applied pending migrations ({applied} total) to `{}`", config.database.url),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(COMMAND, error_class, message, exit_code)
        }
    }
}
