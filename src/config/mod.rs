//! Configuration (layered: code > env > profiles file).

pub mod profiles;

pub use profiles::{AgentProfile, AgentsFile, ProfileDefaults, DEFAULT_PROFILE};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::container::DEFAULT_TOKEN_PATH;
use crate::auth::{AuthError, ContainerToken, KeyPairJwt, PatToken, TokenProvider};
use crate::error::{AgentError, Result};

/// Default bound on one whole agent call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Location of one agent and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub database: String,
    pub schema: String,
    pub agent_name: String,
    pub host: String,
    pub timeout: Duration,
    base_url: Option<String>,
}

impl AgentConfig {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        agent_name: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            agent_name: agent_name.into(),
            host: host.into(),
            timeout: DEFAULT_TIMEOUT,
            base_url: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace `https://{host}` as the URL prefix (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// `POST` target for `agents/{name}:run`.
    pub fn endpoint(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.host));
        format!(
            "{base}/api/v2/databases/{}/schemas/{}/agents/{}:run",
            self.database, self.schema, self.agent_name
        )
    }
}

/// Settings read from the environment.
///
/// | Variable | Field |
/// |---|---|
/// | `SNOWFLAKE_ACCOUNT` | `account` |
/// | `SNOWFLAKE_HOST` | `host` |
/// | `SNOWFLAKE_PAT` | `pat` |
/// | `SNOWFLAKE_USER` | `user` |
/// | `SNOWFLAKE_PRIVATE_KEY_PATH` | `private_key_path` |
/// | `AGENT_NAME` / `AGENT_DATABASE` / `AGENT_SCHEMA` | agent location |
/// | `AGENT_TIMEOUT_SECS` | `timeout` |
#[derive(Clone, Default)]
pub struct ClientSettings {
    pub account: Option<String>,
    pub host: Option<String>,
    pub pat: Option<String>,
    pub user: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub container_token_path: Option<PathBuf>,
    pub agent_name: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("account", &self.account)
            .field("host", &self.host)
            .field("pat", &self.pat.as_ref().map(|_| ".."))
            .field("user", &self.user)
            .field("private_key_path", &self.private_key_path)
            .field("container_token_path", &self.container_token_path)
            .field("agent_name", &self.agent_name)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientSettings {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match get("AGENT_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|_| {
                AgentError::Configuration(format!("AGENT_TIMEOUT_SECS is not a number: {raw}"))
            })?)),
            None => None,
        };

        Ok(Self {
            account: get("SNOWFLAKE_ACCOUNT"),
            host: get("SNOWFLAKE_HOST"),
            pat: get("SNOWFLAKE_PAT"),
            user: get("SNOWFLAKE_USER"),
            private_key_path: get("SNOWFLAKE_PRIVATE_KEY_PATH").map(PathBuf::from),
            container_token_path: None,
            agent_name: get("AGENT_NAME"),
            database: get("AGENT_DATABASE"),
            schema: get("AGENT_SCHEMA"),
            timeout,
        })
    }

    /// Take the agent location from a profile, unless already set explicitly.
    pub fn apply_profile(&mut self, profile: &AgentProfile, defaults: &ProfileDefaults) {
        self.agent_name.get_or_insert_with(|| profile.name.clone());
        self.database.get_or_insert_with(|| profile.database.clone());
        self.schema.get_or_insert_with(|| profile.schema.clone());
        self.timeout
            .get_or_insert_with(|| Duration::from_secs(profile.timeout_secs.unwrap_or(defaults.timeout_secs)));
    }

    /// Build a token provider: PAT, then key-pair, then the container token.
    pub fn token_provider(&self) -> Result<Arc<dyn TokenProvider>> {
        if let Some(pat) = &self.pat {
            let account = self.require_account("a personal access token")?;
            return Ok(Arc::new(PatToken::new(account, pat.clone())));
        }

        if let (Some(user), Some(key_path)) = (&self.user, &self.private_key_path) {
            let account = self.require_account("key-pair authentication")?;
            return Ok(Arc::new(KeyPairJwt::from_pem_file(account, user, key_path)?));
        }

        let token_path = self
            .container_token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH));
        if token_path.exists() {
            let provider = ContainerToken::from_lookup(token_path, |key| match key {
                "SNOWFLAKE_HOST" => self.host.clone(),
                "SNOWFLAKE_ACCOUNT" => self.account.clone(),
                _ => None,
            })?;
            return Ok(Arc::new(provider));
        }

        Err(AuthError::MissingCredential(
            "set SNOWFLAKE_PAT, or SNOWFLAKE_USER with SNOWFLAKE_PRIVATE_KEY_PATH, \
             or run inside a container runtime"
                .to_string(),
        )
        .into())
    }

    /// Agent location for a provider; `SNOWFLAKE_HOST` overrides the provider's host.
    pub fn agent_config(&self, provider: &dyn TokenProvider) -> Result<AgentConfig> {
        let require = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| AgentError::Configuration(format!("{name} is not set")))
        };
        let host = self.host.clone().unwrap_or_else(|| provider.host());
        let config = AgentConfig::new(
            require(&self.database, "AGENT_DATABASE")?,
            require(&self.schema, "AGENT_SCHEMA")?,
            require(&self.agent_name, "AGENT_NAME")?,
            host,
        );
        Ok(config.with_timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT)))
    }

    fn require_account(&self, purpose: &str) -> std::result::Result<&str, AuthError> {
        self.account.as_deref().ok_or_else(|| {
            AuthError::MissingCredential(format!("SNOWFLAKE_ACCOUNT is required for {purpose}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_host() {
        let config = AgentConfig::new("SKI_RESORT_DB", "AGENTS", "RESORT_EXECUTIVE", "acct.snowflakecomputing.com");
        assert_eq!(
            config.endpoint(),
            "https://acct.snowflakecomputing.com/api/v2/databases/SKI_RESORT_DB/schemas/AGENTS/agents/RESORT_EXECUTIVE:run"
        );
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let config = AgentConfig::new("DB", "S", "A", "ignored").with_base_url("http://127.0.0.1:9000/");
        assert_eq!(
            config.endpoint(),
            "http://127.0.0.1:9000/api/v2/databases/DB/schemas/S/agents/A:run"
        );
    }

    #[test]
    fn debug_hides_pat() {
        let settings = ClientSettings {
            pat: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
