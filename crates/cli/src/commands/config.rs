use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use luminova_core::config::{LoadOptions, DEFAULT_CONFIG_FILE, NESTED_CONFIG_FILE};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

/// Plain-text listing on success; a failed load reports the usual JSON
/// outcome with the configuration exit code.
pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match load_config(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error(COMMAND, &error),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec![
        "effective config (source precedence: env > file > default; command-line flags are not attributed):".to_string(),
    ];

    lines.push(render_line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        source("llm.provider", &["LUMINOVA_LLM_PROVIDER"]),
    ));
    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        source("llm.model", &["LUMINOVA_LLM_MODEL"]),
    ));
    lines.push(render_line(
        "llm.base_url",
        config.llm.effective_base_url(),
        source("llm.base_url", &["LUMINOVA_LLM_BASE_URL"]),
    ));

    let llm_api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "llm.api_key",
        &llm_api_key,
        source("llm.api_key", &["LUMINOVA_LLM_API_KEY", "GROQ_API_KEY"]),
    ));
    lines.push(render_line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        source("llm.timeout_secs", &["LUMINOVA_LLM_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "llm.max_retries",
        &config.llm.max_retries.to_string(),
        source("llm.max_retries", &["LUMINOVA_LLM_MAX_RETRIES"]),
    ));
    lines.push(render_line(
        "llm.retry_backoff_ms",
        &config.llm.retry_backoff_ms.to_string(),
        source("llm.retry_backoff_ms", &["LUMINOVA_LLM_RETRY_BACKOFF_MS"]),
    ));

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", &["LUMINOVA_DATABASE_URL"]),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", &["LUMINOVA_DATABASE_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", &["LUMINOVA_DATABASE_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "profile.user_id",
        config.profile.user_id.as_deref().unwrap_or("<generated per run>"),
        source("profile.user_id", &["LUMINOVA_USER_ID"]),
    ));
    lines.push(render_line(
        "profile.persist",
        &config.profile.persist.to_string(),
        source("profile.persist", &["LUMINOVA_PROFILE_PERSIST"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["LUMINOVA_LOGGING_LEVEL", "LUMINOVA_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["LUMINOVA_LOGGING_FORMAT", "LUMINOVA_LOG_FORMAT"]),
    ));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognizable provider prefix (`gsk_`, `sk-`) and hides the rest.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    for separator in ['_', '-'] {
        if let Some((prefix, _)) = trimmed.split_once(separator) {
            if !prefix.is_empty() && prefix.len() <= 4 {
                return format!("{prefix}{separator}***");
            }
        }
    }

    "<redacted>".to_string()
}
