//! Authentication from a token file mounted by the container runtime.

use std::fs;
use std::path::{Path, PathBuf};

use super::{account_host, snowflake_token_header, AuthError, TokenProvider};

/// Where the container runtime mounts the session token.
pub const DEFAULT_TOKEN_PATH: &str = "/snowflake/session/token";

/// Reads the runtime-mounted token on every call, since the runtime rotates it.
#[derive(Debug, Clone)]
pub struct ContainerToken {
    path: PathBuf,
    host: String,
}

impl ContainerToken {
    /// Use the default token path and resolve the host from the environment.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(DEFAULT_TOKEN_PATH, |key| std::env::var(key).ok())
    }

    /// The token file is checked before the host, so outside the runtime the
    /// error is always [`AuthError::TokenFileMissing`].
    pub(crate) fn from_lookup(
        path: impl Into<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AuthError> {
        let path = path.into();
        if !path.exists() {
            return Err(AuthError::TokenFileMissing { path });
        }
        let host = resolve_host(lookup)?;
        Ok(Self { path, host })
    }

    /// Use an explicit token path and host.
    ///
    /// Fails when the file is absent: that means we are not running inside
    /// the container runtime.
    pub fn with_path(path: impl Into<PathBuf>, host: impl Into<String>) -> Result<Self, AuthError> {
        let path = path.into();
        if !path.exists() {
            return Err(AuthError::TokenFileMissing { path });
        }
        Ok(Self {
            path,
            host: host.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `SNOWFLAKE_HOST`, else a host derived from `SNOWFLAKE_ACCOUNT`.
fn resolve_host(lookup: impl Fn(&str) -> Option<String>) -> Result<String, AuthError> {
    if let Some(host) = lookup("SNOWFLAKE_HOST").filter(|h| !h.trim().is_empty()) {
        return Ok(host);
    }
    if let Some(account) = lookup("SNOWFLAKE_ACCOUNT").filter(|a| !a.trim().is_empty()) {
        return Ok(account_host(&account));
    }
    Err(AuthError::HostUnresolved(
        "set SNOWFLAKE_HOST or SNOWFLAKE_ACCOUNT".to_string(),
    ))
}

impl TokenProvider for ContainerToken {
    fn token(&self) -> Result<String, AuthError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => AuthError::TokenFileMissing {
                path: self.path.clone(),
            },
            _ => AuthError::TokenFileRead {
                path: self.path.clone(),
                source,
            },
        })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(AuthError::MissingCredential(format!(
                "token file {} is empty",
                self.path.display()
            )));
        }
        Ok(token.to_string())
    }

    fn host(&self) -> String {
        self.host.clone()
    }

    fn auth_header(&self) -> Result<String, AuthError> {
        Ok(snowflake_token_header(&self.token()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_host_wins_over_account() {
        let host = resolve_host(|key| match key {
            "SNOWFLAKE_HOST" => Some("custom.example.com".to_string()),
            "SNOWFLAKE_ACCOUNT" => Some("acct".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(host, "custom.example.com");
    }

    #[test]
    fn account_is_used_without_host() {
        let host = resolve_host(|key| (key == "SNOWFLAKE_ACCOUNT").then(|| "ACCT".to_string()))
            .unwrap();
        assert_eq!(host, "acct.snowflakecomputing.com");
    }

    #[test]
    fn missing_file_is_reported_before_host() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("token");
        match ContainerToken::from_lookup(&missing, |_| None) {
            Err(AuthError::TokenFileMissing { path }) => assert_eq!(path, missing),
            other => panic!("expected TokenFileMissing, got {other:?}"),
        }
    }

    #[test]
    fn present_file_still_needs_a_host() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ContainerToken::from_lookup(file.path(), |_| None),
            Err(AuthError::HostUnresolved(_))
        ));
    }

    #[test]
    fn no_host_or_account_fails() {
        assert!(matches!(
            resolve_host(|_| None),
            Err(AuthError::HostUnresolved(_))
        ));
    }
}
