//! Folds classified events into an [`AgentResult`].

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use super::event::StreamEvent;
use super::extract;
use super::warning::DecodeWarning;
use crate::types::{AgentResult, ChartSpec};

/// Receives de-duplicated status messages while a response streams.
pub type ProgressCallback = Box<dyn FnMut(&str) + Send>;

/// Accumulates one response. Events must be applied in arrival order.
#[derive(Default)]
pub struct ResponseAggregator {
    result: AgentResult,
    last_status: Option<String>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for ResponseAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseAggregator")
            .field("result", &self.result)
            .field("last_status", &self.last_status)
            .field("progress", &self.progress.as_ref().map(|_| ".."))
            .finish()
    }
}

impl ResponseAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: ProgressCallback) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// Record a parsed frame verbatim, then apply its classified event.
    pub fn apply_frame(&mut self, event: Option<&str>, payload: Value) {
        let classified = StreamEvent::classify(event, &payload);
        self.track_tool_type(&payload);
        self.result.raw_events.push(payload);
        self.apply(classified);
    }

    pub fn record_warning(&mut self, warning: DecodeWarning) {
        warn!(%warning, "Decode warning");
        self.result.warnings.push(warning);
    }

    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::TextDelta { text } | StreamEvent::Text { text } => {
                self.result.text.push_str(&text)
            }
            StreamEvent::ThinkingDelta { text } => self.result.thinking.push_str(&text),
            StreamEvent::ToolUse(payload) => self.result.tool_calls.push(payload),
            StreamEvent::ToolResult(payload) => {
                extract::apply_tool_result(&payload, &mut self.result)
            }
            StreamEvent::Table(payload) => extract::apply_table(&payload, &mut self.result),
            StreamEvent::Chart {
                chart_spec,
                tool_use_id,
            } => self.apply_chart(chart_spec, tool_use_id),
            StreamEvent::Status { message, .. } => self.report_status(message),
            // the final response arrives after every delta and replaces them
            StreamEvent::Response { text: Some(text) } => self.result.text = text,
            StreamEvent::Response { text: None } | StreamEvent::Done => {}
            StreamEvent::ExecutionTrace(payload) => {
                if let Some(sql) = extract::sql_from_trace(&payload) {
                    self.result.record_sql(&sql);
                }
            }
            StreamEvent::Other { event, .. } => {
                debug!(event = event.as_deref().unwrap_or("<none>"), "Unhandled stream event");
            }
        }
    }

    /// Close out the response.
    ///
    /// Falls back to a fenced SQL block in the answer when no event carried SQL.
    pub fn finish(mut self) -> AgentResult {
        if self.result.sql.is_none() {
            if let Some(sql) = extract::sql_code_block(&self.result.text) {
                self.result.record_sql(&sql);
            }
        }
        self.result
    }

    pub fn result(&self) -> &AgentResult {
        &self.result
    }

    fn apply_chart(&mut self, chart_spec: Value, tool_use_id: Option<String>) {
        let spec = match chart_spec {
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(spec) => spec,
                Err(e) => {
                    self.record_warning(DecodeWarning::MalformedChart {
                        tool_use_id,
                        reason: e.to_string(),
                    });
                    return;
                }
            },
            Value::Object(_) => chart_spec,
            Value::Null => return,
            other => {
                self.record_warning(DecodeWarning::MalformedChart {
                    tool_use_id,
                    reason: format!("unexpected chart_spec value: {other}"),
                });
                return;
            }
        };
        let chart_type = chart_mark(&spec).unwrap_or_else(|| "unknown".to_string());
        self.result.chart_specs.push(ChartSpec {
            spec,
            tool_use_id,
            chart_type,
        });
    }

    fn report_status(&mut self, message: String) {
        if self.last_status.as_deref() == Some(message.as_str()) {
            return;
        }
        if let Some(progress) = self.progress.as_mut() {
            progress(&message);
        }
        self.last_status = Some(message);
    }

    fn track_tool_type(&mut self, payload: &Value) {
        let Some(tool) = payload.get("type").and_then(Value::as_str) else {
            return;
        };
        if tool.to_lowercase().contains("cortex") && !self.result.tools_used.iter().any(|t| t == tool)
        {
            self.result.tools_used.push(tool.to_string());
        }
    }
}

/// `mark` may be a string or an object with a `type`.
fn chart_mark(spec: &Value) -> Option<String> {
    match spec.get("mark")? {
        Value::String(mark) => Some(mark.clone()),
        Value::Object(mark) => mark.get("type").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
