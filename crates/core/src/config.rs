use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::profile::UserId;

pub const DEFAULT_CONFIG_FILE: &str = "luminova.toml";
pub const NESTED_CONFIG_FILE: &str = "config/luminova.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub profile: ProfileConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ProfileConfig {
    pub user_id: Option<String>,
    pub persist: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Groq,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_max_retries: Option<u32>,
    pub database_url: Option<String>,
    pub user_id: Option<String>,
    pub persist_profile: Option<bool>,
    pub log_level: Option<String>,
}

/// Which sections `AppConfig::load` validates. Commands that never call the
/// model load with `Storage`, so a missing API key does not block them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationScope {
    #[default]
    Full,
    Storage,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
    pub scope: ValidationScope,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Groq,
                api_key: None,
                base_url: None,
                model: "llama3-8b-8192".to_string(),
                timeout_secs: 30,
                max_retries: 0,
                retry_backoff_ms: 500,
            },
            database: DatabaseConfig {
                url: "sqlite://luminova.db?mode=rwc".to_string(),
                max_connections: 1,
                timeout_secs: 30,
            },
            profile: ProfileConfig { user_id: None, persist: true },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai",
            Self::OpenAi => "https://api.openai.com",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub fn requires_api_key(self) -> bool {
        matches!(self, Self::Groq | Self::OpenAi)
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected groq|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl ProfileConfig {
    /// The configured user, or a fresh identity for this run.
    pub fn resolve_user_id(&self) -> UserId {
        self.user_id.clone().map(UserId).unwrap_or_else(UserId::generate)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        match options.scope {
            ValidationScope::Full => config.validate()?,
            ValidationScope::Storage => config.validate_storage()?,
        }

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
            if let Some(retry_backoff_ms) = llm.retry_backoff_ms {
                self.llm.retry_backoff_ms = retry_backoff_ms;
            }
        }

        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(profile) = patch.profile {
            if let Some(user_id) = profile.user_id {
                self.profile.user_id = Some(user_id);
            }
            if let Some(persist) = profile.persist {
                self.profile.persist = persist;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LUMINOVA_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key = read_env("LUMINOVA_LLM_API_KEY").or_else(|| read_env("GROQ_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LUMINOVA_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("LUMINOVA_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LUMINOVA_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LUMINOVA_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LUMINOVA_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("LUMINOVA_LLM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("LUMINOVA_LLM_RETRY_BACKOFF_MS") {
            self.llm.retry_backoff_ms = parse_u64("LUMINOVA_LLM_RETRY_BACKOFF_MS", &value)?;
        }

        if let Some(value) = read_env("LUMINOVA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LUMINOVA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("LUMINOVA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LUMINOVA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("LUMINOVA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LUMINOVA_USER_ID") {
            self.profile.user_id = Some(value);
        }
        if let Some(value) = read_env("LUMINOVA_PROFILE_PERSIST") {
            self.profile.persist = parse_bool("LUMINOVA_PROFILE_PERSIST", &value)?;
        }

        let log_level =
            read_env("LUMINOVA_LOGGING_LEVEL").or_else(|| read_env("LUMINOVA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LUMINOVA_LOGGING_FORMAT").or_else(|| read_env("LUMINOVA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(provider) = overrides.llm_provider {
            self.llm.provider = provider;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(base_url);
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(max_retries) = overrides.llm_max_retries {
            self.llm.max_retries = max_retries;
        }
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(user_id) = overrides.user_id {
            self.profile.user_id = Some(user_id);
        }
        if let Some(persist) = overrides.persist_profile {
            self.profile.persist = persist;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        self.validate_storage()
    }

    /// Everything except the `[llm]` section.
    pub fn validate_storage(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_profile(&self.profile)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_retries > 5 {
        return Err(ConfigError::Validation("llm.max_retries must be in range 0..=5".to_string()));
    }

    if llm.provider.requires_api_key() {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for groq/openai providers (set LUMINOVA_LLM_API_KEY or GROQ_API_KEY)"
                    .to_string(),
            ));
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_profile(profile: &ProfileConfig) -> Result<(), ConfigError> {
    if let Some(user_id) = &profile.user_id {
        if user_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "profile.user_id must not be blank when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    database: Option<DatabasePatch>,
    profile: Option<ProfilePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilePatch {
    user_id: Option<String>,
    persist: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
