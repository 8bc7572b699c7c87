//! Tests for settings, provider selection and agent profiles.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use cortex_agent::auth::AuthError;
use cortex_agent::config::{AgentsFile, ClientSettings, DEFAULT_TIMEOUT};
use cortex_agent::error::AgentError;
use pretty_assertions::assert_eq;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const SETTINGS_ENV_VARS: [&str; 9] = [
    "SNOWFLAKE_ACCOUNT",
    "SNOWFLAKE_HOST",
    "SNOWFLAKE_PAT",
    "SNOWFLAKE_USER",
    "SNOWFLAKE_PRIVATE_KEY_PATH",
    "AGENT_NAME",
    "AGENT_DATABASE",
    "AGENT_SCHEMA",
    "AGENT_TIMEOUT_SECS",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn settings(vars: &[(&str, &str)]) -> ClientSettings {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut settings = ClientSettings::from_lookup(|key| vars.get(key).cloned()).unwrap();
    // keep a real runtime token file on the test host out of the picture
    settings.container_token_path = Some(PathBuf::from("/nonexistent/cortex-agent/token"));
    settings
}

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

const AGENT_VARS: [(&str, &str); 3] = [
    ("AGENT_NAME", "RESORT_EXECUTIVE"),
    ("AGENT_DATABASE", "SKI_RESORT_DB"),
    ("AGENT_SCHEMA", "AGENTS"),
];

#[test]
fn pat_settings_build_a_client_config() {
    let mut vars = vec![("SNOWFLAKE_ACCOUNT", "XY12345"), ("SNOWFLAKE_PAT", "pat")];
    vars.extend(AGENT_VARS);
    let settings = settings(&vars);

    let provider = settings.token_provider().unwrap();
    assert_eq!(provider.token_type(), Some("PROGRAMMATIC_ACCESS_TOKEN"));

    let config = settings.agent_config(provider.as_ref()).unwrap();
    assert_eq!(config.host, "xy12345.snowflakecomputing.com");
    assert_eq!(config.agent_name, "RESORT_EXECUTIVE");
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
}

#[test]
fn explicit_host_and_timeout_override_defaults() {
    let mut vars = vec![
        ("SNOWFLAKE_ACCOUNT", "xy12345"),
        ("SNOWFLAKE_PAT", "pat"),
        ("SNOWFLAKE_HOST", "proxy.internal.example"),
        ("AGENT_TIMEOUT_SECS", " 45 "),
    ];
    vars.extend(AGENT_VARS);
    let settings = settings(&vars);

    let provider = settings.token_provider().unwrap();
    let config = settings.agent_config(provider.as_ref()).unwrap();
    assert_eq!(config.host, "proxy.internal.example");
    assert_eq!(config.timeout, Duration::from_secs(45));
}

#[test]
fn invalid_timeout_is_a_configuration_error() {
    let err = ClientSettings::from_lookup(|key| {
        (key == "AGENT_TIMEOUT_SECS").then(|| "soon".to_string())
    })
    .unwrap_err();
    assert!(matches!(err, AgentError::Configuration(_)));
}

#[test]
fn pat_takes_precedence_over_key_pair() {
    let key = fixture("test_rsa_key.pem");
    let settings = settings(&[
        ("SNOWFLAKE_ACCOUNT", "xy12345"),
        ("SNOWFLAKE_PAT", "pat"),
        ("SNOWFLAKE_USER", "alice"),
        ("SNOWFLAKE_PRIVATE_KEY_PATH", key.as_str()),
    ]);
    assert_eq!(
        settings.token_provider().unwrap().token_type(),
        Some("PROGRAMMATIC_ACCESS_TOKEN")
    );
}

#[test]
fn key_pair_is_used_without_pat() {
    let key = fixture("test_rsa_key.pem");
    let settings = settings(&[
        ("SNOWFLAKE_ACCOUNT", "xy12345"),
        ("SNOWFLAKE_USER", "alice"),
        ("SNOWFLAKE_PRIVATE_KEY_PATH", key.as_str()),
    ]);
    assert_eq!(settings.token_provider().unwrap().token_type(), Some("KEYPAIR_JWT"));
}

#[test]
fn container_token_is_the_last_resort() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "runtime-token").unwrap();

    let mut settings = settings(&[("SNOWFLAKE_HOST", "acct.snowflakecomputing.com")]);
    settings.container_token_path = Some(file.path().to_path_buf());

    let provider = settings.token_provider().unwrap();
    assert_eq!(provider.host(), "acct.snowflakecomputing.com");
    assert_eq!(provider.auth_header().unwrap(), "Snowflake Token=\"runtime-token\"");
}

#[test]
fn no_credentials_is_missing_credential() {
    let err = settings(&[("SNOWFLAKE_ACCOUNT", "xy12345")])
        .token_provider()
        .err()
        .expect("no provider");
    assert!(matches!(err, AgentError::Auth(AuthError::MissingCredential(_))));
}

#[test]
fn pat_without_account_is_missing_credential() {
    let err = settings(&[("SNOWFLAKE_PAT", "pat")])
        .token_provider()
        .err()
        .expect("no provider");
    assert!(matches!(err, AgentError::Auth(AuthError::MissingCredential(_))));
}

#[test]
fn agent_location_is_required() {
    let settings = settings(&[("SNOWFLAKE_ACCOUNT", "xy12345"), ("SNOWFLAKE_PAT", "pat")]);
    let provider = settings.token_provider().unwrap();
    let err = settings.agent_config(provider.as_ref()).unwrap_err();
    assert!(matches!(err, AgentError::Configuration(msg) if msg.contains("AGENT_DATABASE")));
}

#[test]
fn from_env_reads_process_environment() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&SETTINGS_ENV_VARS);
    for key in SETTINGS_ENV_VARS {
        std::env::remove_var(key);
    }
    std::env::set_var("SNOWFLAKE_ACCOUNT", "xy12345");
    std::env::set_var("SNOWFLAKE_PAT", "from-env");
    std::env::set_var("AGENT_NAME", "RESORT_EXECUTIVE");
    std::env::set_var("AGENT_TIMEOUT_SECS", "");

    let settings = ClientSettings::from_env().unwrap();
    assert_eq!(settings.account.as_deref(), Some("xy12345"));
    assert_eq!(settings.pat.as_deref(), Some("from-env"));
    assert_eq!(settings.agent_name.as_deref(), Some("RESORT_EXECUTIVE"));
    assert_eq!(settings.database, None);
    assert_eq!(settings.timeout, None);
}

const PROFILES: &str = r#"
[defaults]
timeout_secs = 200
max_context_messages = 6
context_ttl_hours = 0.5
cleanup_interval_minutes = 2.0

[agents.default]
name = "RESORT_EXECUTIVE"
database = "SKI_RESORT_DB"
schema = "AGENTS"

[agents.ops]
name = "LIFT_OPS"
database = "SKI_RESORT_DB"
schema = "OPS"
timeout_secs = 60
"#;

#[test]
fn profiles_parse_and_fall_back_to_default() {
    let file = AgentsFile::parse(PROFILES).unwrap();

    let ops = file.agent_config("ops", "acct.snowflakecomputing.com").unwrap();
    assert_eq!(ops.agent_name, "LIFT_OPS");
    assert_eq!(ops.schema, "OPS");
    assert_eq!(ops.timeout, Duration::from_secs(60));

    let fallback = file.agent_config("marketing", "acct.snowflakecomputing.com").unwrap();
    assert_eq!(fallback.agent_name, "RESORT_EXECUTIVE");
    assert_eq!(fallback.timeout, Duration::from_secs(200));
}

#[test]
fn profiles_without_default_reject_unknown_keys() {
    let file = AgentsFile::parse(
        r#"
[agents.ops]
name = "LIFT_OPS"
database = "DB"
schema = "OPS"
"#,
    )
    .unwrap();
    assert!(file.agent("other").is_none());
    assert!(matches!(
        file.agent_config("other", "host"),
        Err(AgentError::Configuration(_))
    ));
}

#[test]
fn profile_defaults_become_context_settings() {
    let settings = AgentsFile::parse(PROFILES).unwrap().context_settings().unwrap();
    assert_eq!(settings.ttl, Duration::from_secs(1800));
    assert_eq!(settings.max_messages, 6);
    assert_eq!(settings.cleanup_interval, Duration::from_secs(120));

    let empty = AgentsFile::parse("").unwrap().context_settings().unwrap();
    assert_eq!(empty, cortex_agent::context::ContextSettings::default());
}

#[test]
fn non_positive_durations_are_rejected() {
    let file = AgentsFile::parse("[defaults]\ncontext_ttl_hours = 0.0\n").unwrap();
    assert!(matches!(file.context_settings(), Err(AgentError::Configuration(_))));
}

#[test]
fn apply_profile_keeps_explicit_values() {
    let file = AgentsFile::parse(PROFILES).unwrap();
    let mut settings = settings(&[("AGENT_SCHEMA", "CUSTOM")]);
    settings.apply_profile(file.agent("ops").unwrap(), &file.defaults);

    assert_eq!(settings.agent_name.as_deref(), Some("LIFT_OPS"));
    assert_eq!(settings.schema.as_deref(), Some("CUSTOM"));
    assert_eq!(settings.timeout, Some(Duration::from_secs(60)));
}

#[test]
fn profiles_load_from_disk_and_report_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("agents.toml");
    std::fs::write(&good, PROFILES).unwrap();
    assert_eq!(AgentsFile::load(&good).unwrap().agents.len(), 2);

    let bad = dir.path().join("broken.toml");
    std::fs::write(&bad, "[agents.default\nname = 1").unwrap();
    match AgentsFile::load(&bad) {
        Err(AgentError::Configuration(msg)) => assert!(msg.contains("broken.toml")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}
