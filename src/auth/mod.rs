//! Token providers for the agent REST API.
//!
//! Four interchangeable strategies implement [`TokenProvider`]:
//! [`SessionToken`], [`ContainerToken`], [`PatToken`] and [`KeyPairJwt`].
//! The client only ever sees `Arc<dyn TokenProvider>`, so other strategies
//! can be plugged in without touching it.

pub mod container;
pub mod error;
pub mod host;
pub mod key_pair;
pub mod pat;
pub mod session;

pub use container::ContainerToken;
pub use error::AuthError;
pub use host::{account_host, region_host};
pub use key_pair::KeyPairJwt;
pub use pat::PatToken;
pub use session::{SessionHandle, SessionToken};

/// Capability shared by every authentication strategy.
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid token.
    fn token(&self) -> Result<String, AuthError>;

    /// Host serving the agent REST API.
    fn host(&self) -> String;

    /// Value of the `Authorization` header.
    fn auth_header(&self) -> Result<String, AuthError>;

    /// Value of `X-Snowflake-Authorization-Token-Type`, if the strategy needs one.
    fn token_type(&self) -> Option<&'static str> {
        None
    }
}

/// `Snowflake Token="<token>"`, used by session and container tokens.
pub(crate) fn snowflake_token_header(token: &str) -> String {
    format!("Snowflake Token=\"{token}\"")
}
