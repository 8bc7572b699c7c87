//! CLI definitions for `cortex-agent`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::AgentClient;
use crate::config::{AgentsFile, ClientSettings, DEFAULT_PROFILE};
use crate::error::Result;

/// Cortex Agent CLI
#[derive(Parser, Debug)]
#[command(name = "cortex-agent", version, about = "Ask a Cortex agent from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and print the aggregated answer
    Ask(AskArgs),
    /// Ask a question and print the answer as it streams
    Stream(StreamArgs),
}

/// Options shared by every command that talks to an agent.
#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Agent profile key from the profiles file
    #[arg(short, long, default_value = DEFAULT_PROFILE)]
    pub agent: String,

    /// Agent profiles file (TOML)
    #[arg(short, long, env = "CORTEX_AGENTS_FILE")]
    pub config: Option<PathBuf>,

    /// Override the call timeout, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for `cortex-agent ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub agent: AgentArgs,

    /// Print the whole result as JSON
    #[arg(long)]
    pub json: bool,

    /// Show status updates on stderr
    #[arg(short, long)]
    pub progress: bool,

    /// The question
    pub question: String,
}

/// Arguments for `cortex-agent stream`.
#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub agent: AgentArgs,

    /// The question
    pub question: String,
}

impl AgentArgs {
    /// Environment settings, completed from the profiles file when given.
    pub fn settings(&self) -> Result<ClientSettings> {
        let mut settings = ClientSettings::from_env()?;
        if let Some(path) = &self.config {
            let file = AgentsFile::load(path)?;
            if let Some(profile) = file.agent(&self.agent) {
                settings.apply_profile(profile, &file.defaults);
            }
        }
        if let Some(secs) = self.timeout {
            settings.timeout = Some(std::time::Duration::from_secs(secs));
        }
        Ok(settings)
    }

    pub fn client(&self) -> Result<AgentClient> {
        AgentClient::from_settings(&self.settings()?)
    }
}
