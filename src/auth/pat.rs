//! Personal access token authentication.

use std::fmt;

use super::{account_host, AuthError, TokenProvider};

/// Static programmatic access token.
///
/// The simplest strategy for callers running outside the platform.
#[derive(Clone)]
pub struct PatToken {
    account: String,
    pat: String,
}

impl fmt::Debug for PatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatToken")
            .field("account", &self.account)
            .field("pat", &"..")
            .finish()
    }
}

impl PatToken {
    pub fn new(account: impl Into<String>, pat: impl Into<String>) -> Self {
        Self {
            account: account.into().to_lowercase(),
            pat: pat.into(),
        }
    }
}

impl TokenProvider for PatToken {
    fn token(&self) -> Result<String, AuthError> {
        if self.pat.trim().is_empty() {
            return Err(AuthError::MissingCredential(
                "personal access token is empty".to_string(),
            ));
        }
        Ok(self.pat.clone())
    }

    fn host(&self) -> String {
        account_host(&self.account)
    }

    fn auth_header(&self) -> Result<String, AuthError> {
        Ok(format!("Bearer {}", self.token()?))
    }

    fn token_type(&self) -> Option<&'static str> {
        Some("PROGRAMMATIC_ACCESS_TOKEN")
    }
}
