//! Cortex Agent client.
//!
//! Streaming client for Cortex conversational agents: authenticate, post a
//! question (optionally with prior turns) to `agents/{name}:run`, decode the
//! Server-Sent-Events response, and aggregate it into an [`AgentResult`].
//! A TTL-evicted [`ConversationContext`] keeps per-thread history for
//! multi-turn conversations.
//!
//! # Quick Start
//!
//! ```no_run
//! use cortex_agent::prelude::*;
//!
//! # async fn example() -> cortex_agent::error::Result<()> {
//! let client = AgentClient::from_env()?;
//! let result = client.ask("Top 5 resorts by revenue?").await?;
//! println!("{}", result.text);
//! if let Some(sql) = &result.sql {
//!     println!("{sql}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod decoder;
pub mod error;
pub mod prelude;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use client::AgentClient;
pub use config::AgentConfig;
pub use context::ConversationContext;
pub use error::{AgentError, Result};
pub use types::AgentResult;
