use serde::Serialize;
use thiserror::Error;

/// A non-fatal problem met while decoding. Never aborts the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    #[error("skipped malformed frame (event {event:?}): {preview}")]
    MalformedFrame {
        event: Option<String>,
        preview: String,
    },

    #[error("skipped malformed chart spec (tool_use_id {tool_use_id:?}): {reason}")]
    MalformedChart {
        tool_use_id: Option<String>,
        reason: String,
    },
}
