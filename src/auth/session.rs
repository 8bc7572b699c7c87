//! Authentication borrowed from a live, externally owned session.

use std::fmt;
use std::sync::Arc;

use super::{region_host, snowflake_token_header, AuthError, TokenProvider};

/// What the client needs from an external session.
///
/// Implementors adapt whatever connection object the host application owns.
/// `rest_token` returning `None` means the session cannot be used for REST
/// calls (for example a stored-procedure session), and construction of a
/// [`SessionToken`] fails instead of guessing.
pub trait SessionHandle: Send + Sync {
    /// The REST session token, if this session type exposes one.
    fn rest_token(&self) -> Option<String>;

    /// `CURRENT_ACCOUNT()`.
    fn current_account(&self) -> Result<String, AuthError>;

    /// `CURRENT_REGION()`, e.g. `PUBLIC.AWS_US_WEST_2`.
    fn current_region(&self) -> Result<String, AuthError>;

    fn current_database(&self) -> Option<String> {
        None
    }

    fn current_schema(&self) -> Option<String> {
        None
    }
}

/// Token and host extracted once from a [`SessionHandle`].
pub struct SessionToken {
    session: Arc<dyn SessionHandle>,
    token: String,
    host: String,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("host", &self.host)
            .field("token", &"..")
            .finish()
    }
}

impl SessionToken {
    pub fn new(session: Arc<dyn SessionHandle>) -> Result<Self, AuthError> {
        let token = session.rest_token().ok_or_else(|| {
            AuthError::SessionUnsupported(
                "ensure a locally created client session is used".to_string(),
            )
        })?;
        let account = session.current_account()?;
        let region = session.current_region()?;
        Ok(Self {
            host: region_host(&account, &region),
            token,
            session,
        })
    }

    /// The session this provider was built from.
    pub fn session(&self) -> &Arc<dyn SessionHandle> {
        &self.session
    }
}

impl TokenProvider for SessionToken {
    fn token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    fn host(&self) -> String {
        self.host.clone()
    }

    fn auth_header(&self) -> Result<String, AuthError> {
        Ok(snowflake_token_header(&self.token))
    }
}
