//! SQL and result-set extraction from tool payloads.
//!
//! The analyst tool's payload shape has drifted across service versions, so
//! the fixed `content[].json` path is tried first and a depth-capped scan of
//! the whole payload is the fallback.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::types::AgentResult;

/// Nesting depth the fallback scan descends to.
pub const MAX_SCAN_DEPTH: usize = 6;

const SQL_KEYS: [&str; 2] = ["sql", "generated_sql"];
const RESULT_SET_KEY: &str = "result_set";
const ANALYST_TOOL_MARKER: &str = "cortex_analyst";
const TRACE_SQL_ATTRIBUTE: &str = "snow.ai.observability.agent.tool.cortex_analyst.sql_query";

/// Pull `sql` and `result_set` out of a `response.tool_result` payload.
///
/// Only analyst tool results are read; other tools (search, custom) can carry
/// `sql` keys of their own.
pub fn apply_tool_result(payload: &Value, result: &mut AgentResult) {
    if !is_analyst_result(payload) {
        return;
    }
    let mut sql = None;
    let mut result_set = None;

    let fixed = payload
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("json"));
    for json in fixed {
        if sql.is_none() {
            sql = json.get("sql").and_then(non_empty_str);
        }
        if result_set.is_none() {
            result_set = json.get(RESULT_SET_KEY).filter(|rs| rs.is_object());
        }
    }

    let sql = sql.or_else(|| find_sql(payload, 0));
    let result_set = result_set.or_else(|| find_result_set(payload, 0));

    if let Some(sql) = sql {
        result.record_sql(sql);
    }
    if let Some(result_set) = result_set {
        result.record_result_set(result_set);
    }
}

/// Whether `type` or `tool_type` names the analyst tool.
pub fn is_analyst_result(payload: &Value) -> bool {
    ["type", "tool_type"].iter().any(|key| {
        payload
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|tool| tool.to_ascii_lowercase().contains(ANALYST_TOOL_MARKER))
    })
}

/// Pull `result_set` out of a `response.table` payload.
pub fn apply_table(payload: &Value, result: &mut AgentResult) {
    if let Some(result_set) = payload.get(RESULT_SET_KEY).filter(|rs| rs.is_object()) {
        result.record_result_set(result_set);
    }
}

/// First SQL string found by a depth-capped walk.
pub fn find_sql(value: &Value, depth: usize) -> Option<&str> {
    if depth > MAX_SCAN_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => SQL_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(non_empty_str))
            .or_else(|| map.values().find_map(|v| find_sql(v, depth + 1))),
        Value::Array(items) => items.iter().find_map(|v| find_sql(v, depth + 1)),
        _ => None,
    }
}

fn find_result_set(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_SCAN_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => map
            .get(RESULT_SET_KEY)
            .filter(|rs| rs.is_object())
            .or_else(|| map.values().find_map(|v| find_result_set(v, depth + 1))),
        Value::Array(items) => items.iter().find_map(|v| find_result_set(v, depth + 1)),
        _ => None,
    }
}

/// SQL recorded in an `execution_trace` payload.
///
/// The payload is an array of spans, each usually serialized into a string,
/// whose `attributes` carry the analyst tool's query.
pub fn sql_from_trace(payload: &Value) -> Option<String> {
    payload.as_array()?.iter().find_map(|span| {
        let parsed;
        let span = match span {
            Value::String(raw) => {
                parsed = serde_json::from_str::<Value>(raw).ok()?;
                &parsed
            }
            other => other,
        };
        span.get("attributes")?
            .as_array()?
            .iter()
            .filter(|attr| attr.get("key").and_then(Value::as_str) == Some(TRACE_SQL_ATTRIBUTE))
            .find_map(|attr| attr.get("value")?.get("stringValue").and_then(non_empty_str))
            .map(str::to_string)
    })
}

/// First fenced ```sql block in an answer.
pub fn sql_code_block(text: &str) -> Option<String> {
    static SQL_BLOCK: OnceLock<Regex> = OnceLock::new();
    let pattern = SQL_BLOCK.get_or_init(|| {
        Regex::new(r"(?is)```sql\s*(.*?)\s*```").expect("static SQL block pattern")
    });
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|sql| !sql.is_empty())
        .map(str::to_string)
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}
