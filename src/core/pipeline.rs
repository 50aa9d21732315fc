// src/core/pipeline.rs
//! Normalization pipeline: raw submission in, complete fitted field map out.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::app_log;
use crate::config::{BlockSpec, ListSpec, PhotoSpec, PipelineConfig};
use crate::core::field_resolver::{array_items, collect_indexed, resolve, resolve_opt, Record};
use crate::core::shape::{CanonicalRecord, SubmissionShape};
use crate::image_acquisition::{resolve_photo, ImageFetcher, PhotoSources};
use crate::text_fit::{split_items, TextFitter};
use crate::types::{NormalizationOutput, NormalizedFields};

/// Text half of the pipeline. Never suspends and never fails.
#[derive(Debug, Clone)]
pub struct TextStage {
    pub shape: SubmissionShape,
    pub text: BTreeMap<String, String>,
    pub photo_sources: PhotoSources,
}

pub fn normalize_text(submission: &Value, config: &PipelineConfig) -> TextStage {
    let canonical = CanonicalRecord::build(submission, config);
    let record = canonical.record();
    let fitter = TextFitter::new(config.clamp_enabled);

    let mut text = BTreeMap::new();

    for field in &config.fields {
        let raw = resolve(record, &field.candidates(), "");
        text.insert(field.key.clone(), fitter.fit(&raw, field.fit));
    }

    for block in &config.blocks {
        fit_block(record, block, &fitter, &mut text);
    }

    for list in &config.lists {
        let items = list_items(record, list);
        for (offset, item) in items.into_iter().take(list.slot_count).enumerate() {
            text.insert(list.slot_key(offset + 1), fitter.fit(&item, list.fit));
        }
    }

    for key in config.schema_keys() {
        text.entry(key).or_default();
    }

    TextStage {
        shape: canonical.shape().clone(),
        text,
        photo_sources: photo_sources(record, &config.photo),
    }
}

/// Run the full pipeline. Photo acquisition is the only step that awaits.
pub async fn normalize(
    submission: &Value,
    config: &PipelineConfig,
    fetcher: &ImageFetcher,
) -> NormalizationOutput {
    let stage = normalize_text(submission, config);
    let (photo, photo_outcome) = resolve_photo(&stage.photo_sources, fetcher).await;

    app_log!(
        debug,
        "Normalized {} fields from {:?} submission, photo: {}",
        stage.text.len(),
        stage.shape,
        photo_outcome.label()
    );

    NormalizationOutput {
        fields: NormalizedFields::new(stage.text, photo),
        photo_outcome,
        shape: stage.shape,
    }
}

fn fit_block(record: &Record, block: &BlockSpec, fitter: &TextFitter, out: &mut BTreeMap<String, String>) {
    for index in 1..=block.max_count {
        for field in &block.fields {
            let raw = resolve(record, &block.flat_candidates(index, field), "");
            out.insert(block.field_key(index, &field.name), fitter.fit(&raw, field.fit));
        }

        if let Some(bullets) = &block.bullets {
            for bullet in 1..=bullets.max_count {
                let key = block.bullet_key(index, bullet);
                let raw = resolve(record, &[key.as_str()], "");
                out.insert(key, fitter.fit(&raw, bullets.fit));
            }
        }
    }
}

/// Explicit array first, then indexed items, then the split free-text field.
fn list_items(record: &Record, list: &ListSpec) -> Vec<String> {
    let explicit = list
        .list_keys
        .iter()
        .filter_map(|key| record.get(key))
        .filter_map(array_items)
        .find(|items| !items.is_empty());
    if let Some(items) = explicit {
        return items;
    }

    let indexed = list
        .item_prefixes
        .iter()
        .map(|prefix| collect_indexed(record, prefix, list.slot_count))
        .find(|items| !items.is_empty());
    if let Some(items) = indexed {
        return items;
    }

    // a list key holding a plain string counts as free text too
    let free_text_keys: Vec<&String> = list.free_text_keys.iter().chain(&list.list_keys).collect();
    resolve_opt(record, &free_text_keys)
        .map(|text| split_items(&text))
        .unwrap_or_default()
}

fn photo_sources(record: &Record, spec: &PhotoSpec) -> PhotoSources {
    let url = resolve_opt(record, &spec.url_keys).or_else(|| {
        // file-upload fields arrive as an array of links
        spec.url_keys
            .iter()
            .filter_map(|key| record.get(key))
            .filter_map(array_items)
            .find_map(|items| items.into_iter().next())
    });

    PhotoSources {
        inline: resolve(record, &spec.inline_keys, ""),
        url: url.unwrap_or_default(),
    }
}
