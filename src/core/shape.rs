// src/core/shape.rs
//! Shape detection: folds flat, nested and enveloped submissions into one flat record.

use serde::Serialize;
use serde_json::Value;

use crate::config::{BlockSpec, PipelineConfig, SubFieldSpec};
use crate::core::field_resolver::{is_blank, resolve_opt, value_text, Record};
use crate::text_fit::split_items;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SubmissionShape {
    Flat,
    Nested,
    Enveloped { key: String },
}

impl SubmissionShape {
    pub fn detect(submission: &Value, config: &PipelineConfig) -> Self {
        let Some(body) = submission.as_object() else {
            return Self::Flat;
        };

        if let Some(key) = envelope_key(body, config) {
            return Self::Enveloped { key };
        }

        if has_nested_parts(body, config) {
            Self::Nested
        } else {
            Self::Flat
        }
    }
}

fn envelope_key(body: &Record, config: &PipelineConfig) -> Option<String> {
    config
        .envelope_keys
        .iter()
        .find(|key| body.get(key.as_str()).is_some_and(Value::is_object))
        .cloned()
}

fn has_nested_parts(body: &Record, config: &PipelineConfig) -> bool {
    let group = config
        .nested_groups
        .iter()
        .flat_map(|g| g.keys.iter())
        .any(|key| body.get(key).is_some_and(Value::is_object));
    let block = config
        .blocks
        .iter()
        .flat_map(|b| b.array_keys.iter())
        .any(|key| body.get(key).is_some_and(Value::is_array));
    group || block
}

/// The shape-agnostic intermediate record that field resolution runs against.
#[derive(Debug, Clone)]
pub struct CanonicalRecord {
    shape: SubmissionShape,
    fields: Record,
}

impl CanonicalRecord {
    pub fn build(submission: &Value, config: &PipelineConfig) -> Self {
        let shape = SubmissionShape::detect(submission, config);
        let Some(body) = submission.as_object() else {
            return Self {
                shape,
                fields: Record::new(),
            };
        };

        let mut fields = match &shape {
            SubmissionShape::Enveloped { key } => unwrap_envelope(body, key),
            _ => body.clone(),
        };

        lift_nested_groups(&mut fields, config);
        for block in &config.blocks {
            expand_block(&mut fields, block);
        }

        Self { shape, fields }
    }

    pub fn shape(&self) -> &SubmissionShape {
        &self.shape
    }

    pub fn record(&self) -> &Record {
        &self.fields
    }
}

/// Inner payload, plus any sibling keys of the envelope the payload does not define.
fn unwrap_envelope(body: &Record, key: &str) -> Record {
    let mut inner = body
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    for (sibling, value) in body {
        if sibling != key && !inner.contains_key(sibling) {
            inner.insert(sibling.clone(), value.clone());
        }
    }
    inner
}

fn lift_nested_groups(fields: &mut Record, config: &PipelineConfig) {
    for group in &config.nested_groups {
        for key in &group.keys {
            let Some(children) = fields.get(key).and_then(Value::as_object).cloned() else {
                continue;
            };
            for (child, value) in children {
                let flat_key = format!("{}{}", group.prefix, child);
                if fields.get(&flat_key).map_or(true, is_blank) {
                    fields.insert(flat_key, value);
                }
            }
        }
    }
}

/// Write array entries into `{prefix}_{n}_{sub}` keys unless a flat override exists.
fn expand_block(fields: &mut Record, block: &BlockSpec) {
    let Some(entries) = block
        .array_keys
        .iter()
        .find_map(|key| fields.get(key).and_then(Value::as_array))
        .cloned()
    else {
        return;
    };

    for (offset, entry) in entries.iter().take(block.max_count).enumerate() {
        let index = offset + 1;
        let Some(entry) = entry.as_object() else {
            continue;
        };

        for field in &block.fields {
            if resolve_opt(fields, &block.flat_candidates(index, field)).is_some() {
                continue;
            }
            if let Some(text) = entry_value(entry, field) {
                fields.insert(block.field_key(index, &field.name), Value::String(text));
            }
        }

        if let Some(bullets) = &block.bullets {
            let items = bullets
                .array_keys
                .iter()
                .find_map(|key| entry.get(key))
                .map(bullet_items)
                .unwrap_or_default();

            for (b_offset, item) in items.into_iter().take(bullets.max_count).enumerate() {
                let key = block.bullet_key(index, b_offset + 1);
                if fields.get(&key).map_or(true, is_blank) {
                    fields.insert(key, Value::String(item));
                }
            }
        }
    }
}

fn entry_value(entry: &Record, field: &SubFieldSpec) -> Option<String> {
    if let Some(text) = resolve_opt(entry, &field.entry_keys()) {
        return Some(text);
    }

    let range = field.range.as_ref()?;
    let start = resolve_opt(entry, &range.start_keys);
    let end = resolve_opt(entry, &range.end_keys);
    match (start, end) {
        (Some(start), Some(end)) => Some(format!("{} - {}", start, end)),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

/// Bullets come as an array of strings or a single delimited string.
fn bullet_items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|text| !text.is_empty())
            .collect(),
        Value::String(text) => split_items(text),
        _ => Vec::new(),
    }
}
