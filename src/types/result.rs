//! Structured result of one agent call.

use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::decoder::DecodeWarning;

/// Answers shorter than this are treated as "no usable content".
pub const MIN_CONTENT_CHARS: usize = 10;

/// Placeholder the analyst tool reports instead of the real statement.
const SQL_PLACEHOLDER: &str = "SQL query executed";

/// A chart specification emitted by the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Parsed chart spec (Vega-Lite).
    pub spec: Value,
    pub tool_use_id: Option<String>,
    /// The spec's `mark`, or `"unknown"`.
    #[serde(rename = "type")]
    pub chart_type: String,
}

/// Everything extracted from one streamed response.
///
/// Created per call and owned by the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentResult {
    /// Answer text: the concatenated deltas, or the final `response` text.
    pub text: String,
    /// Every successfully parsed `data:` frame, in arrival order.
    pub raw_events: Vec<Value>,
    pub tool_calls: Vec<Value>,
    /// Distinct tool types seen in the stream, in first-seen order.
    pub tools_used: Vec<String>,
    pub chart_specs: Vec<ChartSpec>,
    pub thinking: String,
    pub column_names: Vec<String>,
    pub result_set: Option<Value>,
    /// First SQL statement seen; never overwritten once set.
    pub sql: Option<String>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub warnings: Vec<DecodeWarning>,
}

impl AgentResult {
    pub fn has_content(&self) -> bool {
        self.text.chars().count() >= MIN_CONTENT_CHARS
    }

    /// Whether a result set with at least one row was returned.
    pub fn has_data(&self) -> bool {
        self.rows().is_some_and(|rows| !rows.is_empty())
    }

    pub fn has_chart(&self) -> bool {
        !self.chart_specs.is_empty()
    }

    pub fn has_sql(&self) -> bool {
        self.sql
            .as_deref()
            .is_some_and(|sql| !sql.trim().is_empty() && sql != SQL_PLACEHOLDER)
    }

    /// Rows of the result set (`result_set.data`).
    pub fn rows(&self) -> Option<&Vec<Value>> {
        self.result_set.as_ref()?.get("data")?.as_array()
    }

    /// Set `sql` unless a statement was already recorded.
    pub(crate) fn record_sql(&mut self, sql: &str) -> bool {
        if self.sql.is_some() || sql.trim().is_empty() {
            return false;
        }
        self.sql = Some(sql.to_string());
        true
    }

    /// Replace the result set and the column names from its metadata.
    pub(crate) fn record_result_set(&mut self, result_set: &Value) {
        self.column_names = result_set
            .get("resultSetMetaData")
            .and_then(|meta| meta.get("rowType"))
            .and_then(Value::as_array)
            .map(|columns| {
                columns
                    .iter()
                    .filter_map(|col| col.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        self.result_set = Some(result_set.clone());
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
