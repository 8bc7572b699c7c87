//! Error types for the agent client.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::auth::AuthError;

/// Maximum number of characters of an error body kept in [`AgentError::Protocol`].
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Primary error type for all client operations.
///
/// Decode-level problems never show up here; they are absorbed by the decoder
/// and reported as [`crate::decoder::DecodeWarning`]s on the result.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Agent API error (status {status}): {body}")]
    Protocol { status: u16, body: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AgentError {
    /// Create a protocol error, truncating the body to [`MAX_ERROR_BODY_CHARS`].
    pub fn protocol(status: u16, body: &str) -> Self {
        Self::Protocol {
            status,
            body: truncate_chars(body, MAX_ERROR_BODY_CHARS),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::InvalidArgument(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Io(_) => ErrorCategory::Io,
            Self::Protocol { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Protocol,
            },
        }
    }

    /// Whether a caller could reasonably retry.
    ///
    /// The client itself never retries: asking a question is not assumed to be
    /// idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Truncate to at most `max` characters without splitting a UTF-8 sequence.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;
