//! Key-pair authentication with self-signed JWTs.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{account_host, AuthError, TokenProvider};

/// Lifetime of a generated token, in seconds.
pub const DEFAULT_JWT_LIFETIME_SECS: i64 = 3600;

/// Source of "now"; injectable so expiry can be tested.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Signs RS256 JWTs from an RSA private key and caches them until expiry.
///
/// A cached token is returned for as long as it is valid; a new one is
/// signed only once `now >= expires_at`.
pub struct KeyPairJwt {
    account: String,
    user: String,
    key: EncodingKey,
    fingerprint: String,
    lifetime: Duration,
    clock: Clock,
    cached: Mutex<Option<CachedJwt>>,
}

#[derive(Debug, Clone)]
struct CachedJwt {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    iat: i64,
    exp: i64,
}

impl fmt::Debug for KeyPairJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairJwt")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("fingerprint", &self.fingerprint)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl KeyPairJwt {
    /// Load a PEM private key (PKCS#8 or PKCS#1) from disk.
    pub fn from_pem_file(
        account: impl Into<String>,
        user: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path).map_err(|source| AuthError::TokenFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(account, user, &pem)
    }

    pub fn from_pem(
        account: impl Into<String>,
        user: impl Into<String>,
        pem: &str,
    ) -> Result<Self, AuthError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| AuthError::KeyPair(format!("invalid RSA private key: {e}")))?;
        let public_der = private_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| AuthError::KeyPair(format!("cannot encode public key: {e}")))?;
        let fingerprint = format!(
            "SHA256:{}",
            STANDARD.encode(Sha256::digest(public_der.as_bytes()))
        );
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::KeyPair(format!("unusable signing key: {e}")))?;

        Ok(Self {
            account: account.into().to_lowercase(),
            user: user.into(),
            key,
            fingerprint,
            lifetime: Duration::seconds(DEFAULT_JWT_LIFETIME_SECS),
            clock: Arc::new(Utc::now),
            cached: Mutex::new(None),
        })
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// `SHA256:<base64>` fingerprint of the public key, as registered on the user.
    pub fn public_key_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `ACCOUNT.USER`, without any region suffix on the account.
    pub fn qualified_username(&self) -> String {
        let account = self
            .account
            .split('.')
            .next()
            .unwrap_or(&self.account)
            .to_uppercase();
        format!("{account}.{}", self.user.to_uppercase())
    }

    fn sign(&self, now: DateTime<Utc>) -> Result<CachedJwt, AuthError> {
        let subject = self.qualified_username();
        let issuer = format!("{subject}.{}", self.fingerprint);
        let expires_at = now + self.lifetime;
        let claims = Claims {
            iss: &issuer,
            sub: &subject,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| AuthError::KeyPair(format!("signing failed: {e}")))?;
        tracing::debug!(subject = %subject, expires_at = %expires_at, "Signed key-pair JWT");
        Ok(CachedJwt { token, expires_at })
    }
}

impl TokenProvider for KeyPairJwt {
    fn token(&self) -> Result<String, AuthError> {
        let now = (self.clock)();
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(jwt) = cached.as_ref() {
            if now < jwt.expires_at {
                return Ok(jwt.token.clone());
            }
        }
        let fresh = self.sign(now)?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn host(&self) -> String {
        account_host(&self.account)
    }

    fn auth_header(&self) -> Result<String, AuthError> {
        Ok(format!("Bearer {}", self.token()?))
    }

    fn token_type(&self) -> Option<&'static str> {
        Some("KEYPAIR_JWT")
    }
}
