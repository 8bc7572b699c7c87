//! Agent profiles file.
//!
//! ```toml
//! [defaults]
//! timeout_secs = 300
//! max_context_messages = 10
//! context_ttl_hours = 1.0
//! cleanup_interval_minutes = 5.0
//!
//! [agents.default]
//! name = "RESORT_EXECUTIVE"
//! database = "SKI_RESORT_DB"
//! schema = "AGENTS"
//! timeout_secs = 120
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::AgentConfig;
use crate::context::ContextSettings;
use crate::error::{AgentError, Result};

/// Profile used when a requested key is unknown.
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentsFile {
    #[serde(default)]
    pub defaults: ProfileDefaults,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentProfile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfileDefaults {
    pub timeout_secs: u64,
    pub max_context_messages: usize,
    pub context_ttl_hours: f64,
    pub cleanup_interval_minutes: f64,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_context_messages: 10,
            context_ttl_hours: 1.0,
            cleanup_interval_minutes: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub database: String,
    pub schema: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl AgentsFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|e| match e {
            AgentError::Configuration(msg) => {
                AgentError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| AgentError::Configuration(e.to_string()))
    }

    /// Profile by key, falling back to [`DEFAULT_PROFILE`].
    pub fn agent(&self, key: &str) -> Option<&AgentProfile> {
        self.agents
            .get(key)
            .or_else(|| self.agents.get(DEFAULT_PROFILE))
    }

    pub fn agent_config(&self, key: &str, host: impl Into<String>) -> Result<AgentConfig> {
        let profile = self
            .agent(key)
            .ok_or_else(|| AgentError::Configuration(format!("no agent profile '{key}' or '{DEFAULT_PROFILE}'")))?;
        let timeout = profile.timeout_secs.unwrap_or(self.defaults.timeout_secs);
        Ok(
            AgentConfig::new(&profile.database, &profile.schema, &profile.name, host)
                .with_timeout(Duration::from_secs(timeout)),
        )
    }

    /// Conversation cache settings from `[defaults]`.
    pub fn context_settings(&self) -> Result<ContextSettings> {
        let defaults = &self.defaults;
        Ok(ContextSettings {
            ttl: positive_duration(defaults.context_ttl_hours * 3600.0, "context_ttl_hours")?,
            max_messages: defaults.max_context_messages,
            cleanup_interval: positive_duration(
                defaults.cleanup_interval_minutes * 60.0,
                "cleanup_interval_minutes",
            )?,
        })
    }
}

fn positive_duration(secs: f64, field: &str) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(AgentError::Configuration(format!("{field} must be positive")));
    }
    Ok(Duration::from_secs_f64(secs))
}
