use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use luminova_agent::llm::ScriptedLlmClient;
use luminova_cli::commands::{batch, config, doctor, migrate, profile, qualify};
use luminova_core::config::{AppConfig, LoadOptions};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HIGH_FIT: &str = r#"{"qualified_status":"High Fit","priority_score":5,"reasoning":"Enterprise cloud security with AI."}"#;
const NOT_FIT: &str = r#"{"qualified_status":"Not Fit","priority_score":0,"reasoning":"Local consumer pet service."}"#;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[("LUMINOVA_LLM_API_KEY", "gsk_test"), ("LUMINOVA_DATABASE_URL", "sqlite::memory:")],
        || {
            let result = migrate::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn hosted_provider_without_key_is_a_config_failure() {
    with_env(&[("LUMINOVA_PROFILE_PERSIST", "false")], || {
        let result = qualify::run(LoadOptions::default(), "Acme", "Retail", "lead_0");
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "qualify");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("llm.api_key"));
    });
}

#[test]
fn qualify_calls_configured_endpoint_and_reports_result() {
    let (runtime, server) = model_server(ResponseTemplate::new(200).set_body_json(completion(HIGH_FIT)));
    let uri = server.uri();

    with_env(
        &[
            ("LUMINOVA_LLM_PROVIDER", "ollama"),
            ("LUMINOVA_LLM_BASE_URL", &uri),
            ("LUMINOVA_PROFILE_PERSIST", "false"),
        ],
        || {
            let result = qualify::run(
                LoadOptions::default(),
                "CyberSecure Solutions",
                "AI-driven threat detection for enterprise cloud workloads.",
                "lead_42",
            );
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "qualify");
            assert_eq!(payload["data"]["lead_id"], "lead_42");
            assert_eq!(payload["data"]["qualified_status"], "High Fit");
            assert_eq!(payload["data"]["priority_score"], 5);
        },
    );

    drop(server);
    drop(runtime);
}

#[test]
fn batch_writes_results_and_records_profile() {
    let (runtime, server) = model_server(ResponseTemplate::new(200).set_body_json(completion(NOT_FIT)));
    let uri = server.uri();
    let dir = TempDir::new().expect("tempdir");
    let input = write_sheet(
        dir.path(),
        "Company Name,Description\nPawsitive Pet Care,Dog grooming\nCorner Bakery,Bread\nSunny Florist,Flowers\n",
    );
    let output = dir.path().join("results.csv");
    let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("profiles.db").display());

    with_env(
        &[
            ("LUMINOVA_LLM_PROVIDER", "ollama"),
            ("LUMINOVA_LLM_BASE_URL", &uri),
            ("LUMINOVA_DATABASE_URL", &database_url),
            ("LUMINOVA_USER_ID", "rep-1"),
        ],
        || {
            let result = batch::run(LoadOptions::default(), &input, Some(&output));
            assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["data"]["summary"]["total"], 3);
            assert_eq!(payload["data"]["summary"]["not_fit"], 3);
            assert_eq!(payload["data"]["profile_persisted"], true);

            let sheet = fs::read_to_string(&output).expect("results sheet");
            let lines: Vec<_> = sheet.lines().collect();
            assert_eq!(
                lines[0],
                "Original Company Name,Original Description,Qualified Status,Priority Score,Reasoning"
            );
            assert_eq!(lines.len(), 4);
            assert!(lines[1].starts_with("Pawsitive Pet Care,Dog grooming,Not Fit,0,"));

            let stats = profile::run(LoadOptions::default(), 2);
            assert_eq!(stats.exit_code, 0, "unexpected output: {}", stats.output);
            let stats = parse_payload(&stats.output);
            assert_eq!(stats["data"]["user_id"], "rep-1");
            assert_eq!(stats["data"]["total_interactions"], 3);
            assert_eq!(stats["data"]["recent"][0]["company"], "Sunny Florist");
            assert_eq!(stats["data"]["recent"].as_array().map(Vec::len), Some(2));
        },
    );

    drop(server);
    drop(runtime);
}

#[test]
fn batch_keeps_going_when_the_model_endpoint_fails() {
    let (runtime, server) = model_server(ResponseTemplate::new(500).set_body_string("upstream down"));
    let uri = server.uri();
    let dir = TempDir::new().expect("tempdir");
    let input = write_sheet(dir.path(), "Company Name,Description\nAcme,Cloud\nGlobex,Data\n");
    let output = dir.path().join("results.csv");

    with_env(
        &[
            ("LUMINOVA_LLM_PROVIDER", "ollama"),
            ("LUMINOVA_LLM_BASE_URL", &uri),
            ("LUMINOVA_PROFILE_PERSIST", "false"),
        ],
        || {
            let result = batch::run(LoadOptions::default(), &input, Some(&output));
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["data"]["summary"]["error"], 2);
            assert_eq!(payload["data"]["summary"]["not_fit_bucket"], 2);

            let sheet = fs::read_to_string(&output).expect("results sheet");
            assert_eq!(sheet.matches(",Error,0,").count(), 2);
            assert!(sheet.contains("upstream down"));
        },
    );

    drop(server);
    drop(runtime);
}

#[test]
fn batch_rejects_sheet_without_required_columns() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_sheet(dir.path(), "Company,Notes\nAcme,Retail\n");

    with_env(&[("LUMINOVA_LLM_API_KEY", "gsk_test"), ("LUMINOVA_PROFILE_PERSIST", "false")], || {
        let result = batch::run(LoadOptions::default(), &input, Some(&dir.path().join("out.csv")));
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "input");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("Company Name") && message.contains("Description"));
        assert!(!dir.path().join("out.csv").exists());
    });
}

#[test]
fn batch_execute_accepts_an_injected_client() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_sheet(
        dir.path(),
        "Company Name,Description\nCyberSecure Solutions,AI threat detection\nPawsitive Pet Care,Dog grooming\n",
    );
    let output = dir.path().join("results.csv");
    let mut config = AppConfig::default();
    config.profile.persist = false;
    let client = Arc::new(ScriptedLlmClient::replying([HIGH_FIT, NOT_FIT]));

    let result = batch::execute(&config, client.clone(), &input, Some(&output)).expect("batch");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["summary"]["high_fit"], 1);
    assert_eq!(payload["data"]["summary"]["not_fit"], 1);
    assert_eq!(payload["data"]["summary"]["score_histogram"], json!([1, 0, 0, 0, 0, 1]));
    assert_eq!(client.call_count(), 2);
    assert!(client.requests()[0].prompt.contains("Company Name: CyberSecure Solutions"));
}

#[test]
fn profile_requires_a_user_id() {
    with_env(&[("LUMINOVA_LLM_API_KEY", "gsk_test"), ("LUMINOVA_DATABASE_URL", "sqlite::memory:")], || {
        let result = profile::run(LoadOptions::default(), 5);
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "input");
    });
}

#[test]
fn config_output_redacts_api_key() {
    with_env(&[("LUMINOVA_LLM_API_KEY", "gsk_supersecretvalue")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0);
        let output = result.output;

        assert!(output.contains("- llm.api_key = gsk_*** (source: env (LUMINOVA_LLM_API_KEY))"));
        assert!(output.contains("- llm.model = llama3-8b-8192 (source: default)"));
        assert!(!output.contains("supersecretvalue"));
    });
}

#[test]
fn doctor_reports_ready_profile_store() {
    with_env(&[("LUMINOVA_LLM_API_KEY", "gsk_test"), ("LUMINOVA_DATABASE_URL", "sqlite::memory:")], || {
        let result = doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0);
        let report = parse_payload(&result.output);

        assert_eq!(report["overall_status"], "pass");
        let names: Vec<_> =
            report["checks"].as_array().into_iter().flatten().map(|check| check["name"].clone()).collect();
        assert_eq!(names, vec!["config_validation", "llm_credentials", "profile_store"]);
    });
}

#[test]
fn doctor_skips_checks_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 2, "failed config check should use the config exit code");

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
    });
}

#[test]
fn doctor_fails_with_persistence_code_when_store_is_unreachable() {
    let dir = TempDir::new().expect("tempdir");
    let database_url =
        format!("sqlite://{}", dir.path().join("missing").join("profiles.db").display());

    with_env(&[("LUMINOVA_LLM_API_KEY", "gsk_test"), ("LUMINOVA_DATABASE_URL", &database_url)], || {
        let result = doctor::run(LoadOptions::default(), false);

        assert_eq!(result.exit_code, 6);
        assert!(result.output.contains("- [fail] profile_store:"));
    });
}

#[test]
fn config_reports_load_failure_as_json_outcome() {
    with_env(&[("LUMINOVA_LLM_PROVIDER", "openai")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn store_commands_do_not_need_model_credentials() {
    let dir = TempDir::new().expect("tempdir");
    let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("profiles.db").display());

    with_env(&[("LUMINOVA_DATABASE_URL", &database_url), ("LUMINOVA_USER_ID", "rep-9")], || {
        let migrated = migrate::run(LoadOptions::default());
        assert_eq!(migrated.exit_code, 0, "unexpected output: {}", migrated.output);

        let stats = profile::run(LoadOptions::default(), 5);
        assert_eq!(stats.exit_code, 0, "unexpected output: {}", stats.output);
        assert_eq!(parse_payload(&stats.output)["data"]["total_interactions"], 0);
    });
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

/// Mock model endpoint served from its own multi-threaded runtime, so the
/// commands under test can still build their own runtime on this thread.
fn model_server(response: ResponseTemplate) -> (Runtime, MockServer) {
    let runtime = Runtime::new().expect("mock server runtime");
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    });
    (runtime, server)
}

fn write_sheet(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("leads.csv");
    fs::write(&path, contents).expect("write lead sheet");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "LUMINOVA_LLM_PROVIDER",
        "LUMINOVA_LLM_API_KEY",
        "GROQ_API_KEY",
        "LUMINOVA_LLM_BASE_URL",
        "LUMINOVA_LLM_MODEL",
        "LUMINOVA_LLM_TIMEOUT_SECS",
        "LUMINOVA_LLM_MAX_RETRIES",
        "LUMINOVA_LLM_RETRY_BACKOFF_MS",
        "LUMINOVA_DATABASE_URL",
        "LUMINOVA_DATABASE_MAX_CONNECTIONS",
        "LUMINOVA_DATABASE_TIMEOUT_SECS",
        "LUMINOVA_USER_ID",
        "LUMINOVA_PROFILE_PERSIST",
        "LUMINOVA_LOGGING_LEVEL",
        "LUMINOVA_LOGGING_FORMAT",
        "LUMINOVA_LOG_LEVEL",
        "LUMINOVA_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
