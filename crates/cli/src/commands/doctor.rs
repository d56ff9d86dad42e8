use luminova_core::config::{AppConfig, LoadOptions};
use luminova_db::{connect, migrations};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code follows the first failing check: 2 for configuration and
/// credentials, 6 for the profile store.
pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = report.exit_code();

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

impl DoctorReport {
    fn exit_code(&self) -> u8 {
        match self.checks.iter().find(|check| check.status == CheckStatus::Fail) {
            None => 0,
            Some(check) if check.name == "profile_store" => 6,
            Some(_) => 2,
        }
    }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_credentials(&config));
            checks.push(check_profile_store(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "llm_credentials",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "profile_store",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let endpoint = format!("{}/v1/chat/completions", config.llm.effective_base_url());
    let has_key = config.llm.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty());

    match (config.llm.provider.requires_api_key(), has_key) {
        (true, false) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Fail,
            details: format!("{:?} requires llm.api_key", config.llm.provider),
        },
        (_, true) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Pass,
            details: format!("api key present for model `{}` at {endpoint}", config.llm.model),
        },
        (false, false) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Pass,
            details: format!("no api key needed for model `{}` at {endpoint}", config.llm.model),
        },
    }
}

fn check_profile_store(config: &AppConfig) -> DoctorCheck {
    if !config.profile.persist {
        return DoctorCheck {
            name: "profile_store",
            status: CheckStatus::Skipped,
            details: "profile.persist is false, profiles stay in memory".to_string(),
        };
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "profile_store",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| format!("failed to connect to profile store: {error}"))?;
        let applied = migrations::applied_count(&pool)
            .await
            .map_err(|error| format!("failed to read migration state: {error}"));
        pool.close().await;
        applied
    });

    match result {
        Ok(applied) => DoctorCheck {
            name: "profile_store",
            status: CheckStatus::Pass,
            details: format!(
                "connected using `{}` ({applied}/{} migrations applied)",
                config.database.url,
                migrations::available_count()
            ),
        },
        Err(error) => DoctorCheck { name: "profile_store", status: CheckStatus::Fail, details: error },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
