use std::path::PathBuf;

use thiserror::Error;

/// Authentication failures across token strategies.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Session does not expose a REST token: {0}")]
    SessionUnsupported(String),

    #[error("Token file not found at {}; this provider only works inside a container runtime", path.display())]
    TokenFileMissing { path: PathBuf },

    #[error("Failed to read token file {}: {source}", path.display())]
    TokenFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine host: {0}")]
    HostUnresolved(String),

    #[error("Key-pair token error: {0}")]
    KeyPair(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Request rejected (status {status}). {hint}")]
    Rejected { status: u16, hint: String },
}

impl AuthError {
    /// The error for an HTTP 401 from the agent endpoint.
    pub fn unauthorized() -> Self {
        Self::Rejected {
            status: 401,
            hint: "Possible causes: expired or invalid token/PAT; \
                   a runtime token that is not accepted by the agent API; \
                   insufficient privileges on the agent."
                .to_string(),
        }
    }
}
