//! Deadline for a whole agent call.

use std::future::Future;
use std::time::Duration;

use crate::error::{AgentError, Result};

/// Run `call` under `deadline`.
///
/// Covers the streamed body as well as the request, which the per-request
/// reqwest timeout alone does not. An elapsed deadline is reported in
/// milliseconds.
pub async fn with_timeout<T>(deadline: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or_else(|_| Err(AgentError::Timeout(deadline.as_millis() as u64)))
}
