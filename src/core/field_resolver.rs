// src/core/field_resolver.rs
//! Alias-driven lookup over loosely structured records

use serde_json::{Map, Value};

/// A flat submission record: string keys to arbitrary JSON values.
pub type Record = Map<String, Value>;

/// Stringify-and-trim a value.
///
/// `null`, `false`, numeric zero, arrays, objects and whitespace-only strings all
/// count as empty. Numbers and booleans are not expected in this schema, so the
/// falsy values collapse to the absent sentinel instead of rendering as "0"/"false".
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                String::new()
            } else {
                n.to_string()
            }
        }
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

pub fn is_blank(value: &Value) -> bool {
    value_text(value).is_empty()
}

/// First non-empty value among `candidates`, in order.
pub fn resolve_opt<S: AsRef<str>>(record: &Record, candidates: &[S]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| record.get(key.as_ref()))
        .map(value_text)
        .find(|text| !text.is_empty())
}

/// First non-empty value among `candidates`, or `fallback`.
pub fn resolve<S: AsRef<str>>(record: &Record, candidates: &[S], fallback: &str) -> String {
    resolve_opt(record, candidates).unwrap_or_else(|| fallback.to_string())
}

/// Values of `prefix1..=prefixN`, non-empty only, gaps removed.
pub fn collect_indexed(record: &Record, prefix: &str, count: usize) -> Vec<String> {
    (1..=count)
        .filter_map(|index| record.get(&format!("{}{}", prefix, index)))
        .map(value_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Non-empty string items of an array value; scalars inside are stringified.
pub fn array_items(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .map(value_text)
            .filter(|text| !text.is_empty())
            .collect(),
    )
}
