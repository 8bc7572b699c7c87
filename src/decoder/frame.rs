//! Line-level SSE state machine.

use serde_json::Value;

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";
const PREVIEW_CHARS: usize = 120;

/// Decoder state threaded through the line loop.
///
/// The event name is sticky: it applies to every following `data:` line
/// until another `event:` line replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DecoderState {
    #[default]
    AwaitingEventName,
    AwaitingData {
        event: String,
    },
    /// `[DONE]` was seen; every further line is ignored.
    Finished,
}

impl DecoderState {
    pub fn current_event(&self) -> Option<&str> {
        match self {
            Self::AwaitingData { event } => Some(event),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// What a single line produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank line, comment, event name, or an unrelated field.
    Ignored,
    /// A `data:` line whose payload parsed as JSON.
    Frame {
        event: Option<String>,
        payload: Value,
    },
    /// A `data:` line whose payload is not JSON.
    Malformed {
        event: Option<String>,
        preview: String,
    },
    /// The `[DONE]` sentinel.
    Done,
}

/// Advance the state machine by one line.
pub fn decode_line(state: DecoderState, line: &str) -> (DecoderState, LineOutcome) {
    if state.is_finished() {
        return (state, LineOutcome::Ignored);
    }

    let line = line.trim_end_matches('\r');
    if line.is_empty() || line.starts_with(':') {
        return (state, LineOutcome::Ignored);
    }

    if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
        let name = name.trim();
        let next = if name.is_empty() {
            DecoderState::AwaitingEventName
        } else {
            DecoderState::AwaitingData {
                event: name.to_string(),
            }
        };
        return (next, LineOutcome::Ignored);
    }

    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return (state, LineOutcome::Ignored);
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return (DecoderState::Finished, LineOutcome::Done);
    }

    let event = state.current_event().map(str::to_string);
    let outcome = match serde_json::from_str::<Value>(data) {
        Ok(payload) => LineOutcome::Frame { event, payload },
        Err(_) => LineOutcome::Malformed {
            event,
            preview: crate::error::truncate_chars(data, PREVIEW_CHARS),
        },
    };
    (state, outcome)
}
