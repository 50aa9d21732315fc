// src/types/normalized.rs
//! Output of the normalization pipeline

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::shape::SubmissionShape;
use crate::image_acquisition::PhotoOutcome;

/// Every schema key mapped to a fitted string, plus the resolved photo.
///
/// Built once per submission and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFields {
    text: BTreeMap<String, String>,
    photo: Option<Vec<u8>>,
}

impl NormalizedFields {
    pub(crate) fn new(text: BTreeMap<String, String>, photo: Option<Vec<u8>>) -> Self {
        Self { text, photo }
    }

    /// Empty string for keys outside the schema.
    pub fn get(&self, key: &str) -> &str {
        self.text.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.text.contains_key(key)
    }

    pub fn text(&self) -> &BTreeMap<String, String> {
        &self.text
    }

    pub fn photo(&self) -> Option<&[u8]> {
        self.photo.as_deref()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// JSON view for debugging: text keys as-is, the photo as its byte length or null.
    pub fn to_json(&self, photo_key: &str) -> serde_json::Value {
        let mut map: serde_json::Map<String, serde_json::Value> = self
            .text
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        map.insert(
            photo_key.to_string(),
            self.photo
                .as_ref()
                .map_or(serde_json::Value::Null, |bytes| bytes.len().into()),
        );
        serde_json::Value::Object(map)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizationOutput {
    pub fields: NormalizedFields,
    pub photo_outcome: PhotoOutcome,
    pub shape: SubmissionShape,
}

/// Serializable summary returned by `/normalize` and the `normalize` command.
#[derive(Debug, Serialize)]
pub struct NormalizationReport {
    pub shape: SubmissionShape,
    pub photo: PhotoReport,
    pub fields: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct PhotoReport {
    pub source: &'static str,
    pub bytes: Option<usize>,
    pub error: Option<String>,
}

impl NormalizationReport {
    pub fn from_output(output: &NormalizationOutput, photo_key: &str) -> Self {
        Self {
            shape: output.shape.clone(),
            photo: PhotoReport {
                source: output.photo_outcome.label(),
                bytes: output.fields.photo().map(<[u8]>::len),
                error: output.photo_outcome.error().map(|e| e.to_string()),
            },
            fields: output.fields.to_json(photo_key),
        }
    }
}
