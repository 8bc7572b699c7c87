//! Shared HTTP client, request headers, and status mapping.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::auth::{AuthError, TokenProvider};
use crate::error::{AgentError, Result};

/// Header naming the kind of token in `Authorization`.
pub const TOKEN_TYPE_HEADER: HeaderName =
    HeaderName::from_static("x-snowflake-authorization-token-type");

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// No client-wide timeout: each request carries the agent's own.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Headers for a streaming `agents/{name}:run` call.
pub fn agent_headers(provider: &dyn TokenProvider) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

    let auth = provider.auth_header()?;
    let auth = HeaderValue::from_str(&auth)
        .map_err(|_| AuthError::InvalidHeader("Authorization contains invalid characters".into()))?;
    headers.insert(AUTHORIZATION, auth);

    if let Some(token_type) = provider.token_type() {
        headers.insert(TOKEN_TYPE_HEADER, HeaderValue::from_static(token_type));
    }
    Ok(headers)
}

/// Pass a 200 through; map everything else to an error.
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(AuthError::unauthorized().into());
    }
    let body = response.text().await.unwrap_or_default();
    Err(AgentError::protocol(status.as_u16(), &body))
}

/// Map a transport error, reporting timeouts with the configured bound.
pub fn transport_error(error: reqwest::Error, timeout_ms: u64) -> AgentError {
    if error.is_timeout() {
        AgentError::Timeout(timeout_ms)
    } else {
        AgentError::Network(error)
    }
}
