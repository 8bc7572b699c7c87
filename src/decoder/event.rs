//! Typed view of decoded frames.

use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

/// Event names the decoder understands, in their wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
pub enum EventKind {
    #[strum(serialize = "response.text.delta")]
    TextDelta,
    #[strum(serialize = "response.text")]
    Text,
    #[strum(serialize = "response.thinking.delta")]
    ThinkingDelta,
    #[strum(serialize = "response.tool_use")]
    ToolUse,
    #[strum(serialize = "response.tool_result")]
    ToolResult,
    #[strum(serialize = "response.table")]
    Table,
    #[strum(serialize = "response.chart")]
    Chart,
    #[strum(serialize = "response.status")]
    Status,
    /// Final, authoritative response.
    #[strum(serialize = "response")]
    Response,
    #[strum(serialize = "execution_trace")]
    ExecutionTrace,
}

/// One decoded frame, classified by its sticky event name and payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta { text: String },
    /// A whole `response.text` block; not an incremental chunk.
    Text { text: String },
    ThinkingDelta { text: String },
    ToolUse(Value),
    ToolResult(Value),
    Table(Value),
    /// `chart_spec` is usually a JSON document serialized into a string.
    Chart {
        chart_spec: Value,
        tool_use_id: Option<String>,
    },
    Status { status: String, message: String },
    /// Final response; `text` is `None` when it carries no text content.
    Response { text: Option<String> },
    ExecutionTrace(Value),
    /// Anything else. Kept so new event types are never lost.
    Other {
        event: Option<String>,
        payload: Value,
    },
    Done,
}

impl StreamEvent {
    /// Classify a parsed payload under its current event name.
    pub fn classify(event: Option<&str>, payload: &Value) -> Self {
        let kind = event.and_then(|name| name.parse::<EventKind>().ok());
        let text = || payload.get("text").and_then(Value::as_str).map(str::to_string);

        let classified = match kind {
            Some(EventKind::TextDelta) => text().map(|text| Self::TextDelta { text }),
            Some(EventKind::Text) => text().map(|text| Self::Text { text }),
            Some(EventKind::ThinkingDelta) => text().map(|text| Self::ThinkingDelta { text }),
            Some(EventKind::ToolUse) => Some(Self::ToolUse(payload.clone())),
            Some(EventKind::ToolResult) => Some(Self::ToolResult(payload.clone())),
            Some(EventKind::Table) => Some(Self::Table(payload.clone())),
            Some(EventKind::Chart) => Some(Self::Chart {
                chart_spec: payload.get("chart_spec").cloned().unwrap_or(Value::Null),
                tool_use_id: payload
                    .get("tool_use_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            Some(EventKind::Response) => Some(Self::Response {
                text: final_text(payload),
            }),
            Some(EventKind::ExecutionTrace) => Some(Self::ExecutionTrace(payload.clone())),
            Some(EventKind::Status) | None => None,
        };

        classified
            .or_else(|| status(payload))
            .unwrap_or_else(|| Self::Other {
                event: event.map(str::to_string),
                payload: payload.clone(),
            })
    }
}

/// Last text part of a final `response` payload.
///
/// Text parts interleave with tool use, so earlier ones are preamble.
fn final_text(payload: &Value) -> Option<String> {
    payload
        .get("content")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .last()
        .map(str::to_string)
}

fn status(payload: &Value) -> Option<StreamEvent> {
    let status = payload.get("status")?.as_str()?;
    let message = payload.get("message")?.as_str()?;
    Some(StreamEvent::Status {
        status: status.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_kind_round_trips_wire_names() {
        assert_eq!("response".parse::<EventKind>().unwrap(), EventKind::Response);
        assert_eq!(EventKind::ToolResult.to_string(), "response.tool_result");
        assert!("response.unknown".parse::<EventKind>().is_err());
    }

    #[test]
    fn final_response_keeps_last_text_part() {
        let payload = json!({"content": [
            {"type": "thinking", "thinking": {"text": "hmm"}},
            {"type": "text", "text": "Revenue was "},
            {"type": "tool_use", "tool_use": {}},
            {"type": "text", "text": "$4.2M."}
        ]});
        assert_eq!(
            StreamEvent::classify(Some("response"), &payload),
            StreamEvent::Response {
                text: Some("$4.2M.".to_string())
            }
        );
    }

    #[test]
    fn whole_text_block_is_not_a_delta() {
        let payload = json!({"text": "Hello world"});
        assert_eq!(
            StreamEvent::classify(Some("response.text"), &payload),
            StreamEvent::Text {
                text: "Hello world".to_string()
            }
        );
        assert_eq!(
            StreamEvent::classify(Some("response.text.delta"), &payload),
            StreamEvent::TextDelta {
                text: "Hello world".to_string()
            }
        );
    }

    #[test]
    fn status_shaped_payload_under_unknown_event() {
        let payload = json!({"status": "planning", "message": "Planning the next steps"});
        assert_eq!(
            StreamEvent::classify(Some("response.status"), &payload),
            StreamEvent::Status {
                status: "planning".to_string(),
                message: "Planning the next steps".to_string()
            }
        );
        assert!(matches!(
            StreamEvent::classify(None, &payload),
            StreamEvent::Status { .. }
        ));
    }

    #[test]
    fn delta_without_text_is_other() {
        let event = StreamEvent::classify(Some("response.text.delta"), &json!({"index": 0}));
        assert!(matches!(event, StreamEvent::Other { .. }));
    }
}
