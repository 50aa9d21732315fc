// src/generator.rs
use chrono::{Datelike, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::app_log;
use crate::config::PipelineConfig;
use crate::converter::{FormatConverter, SofficeConverter};
use crate::core::config_manager::{AppConfig, ProfileSet};
use crate::core::field_resolver::resolve_opt;
use crate::core::pipeline::normalize;
use crate::core::shape::CanonicalRecord;
use crate::error::GenerateError;
use crate::image_acquisition::{ImageFetcher, PhotoOutcome};
use crate::template_processor::{DocumentRenderer, PptxRenderer};
use crate::template_system::TemplateCatalog;
use crate::types::NormalizationOutput;
use crate::utils::pdf_filename;
use crate::workspace::WorkspaceManager;

const NAME_KEY: &str = "name";
const SELECTOR_KEY: &str = "template_id";

#[derive(Debug)]
pub struct GeneratedDocument {
    pub pdf: Vec<u8>,
    pub filename: String,
    pub template_id: u32,
    pub photo: PhotoOutcome,
}

/// Template selection, normalization, rendering and conversion for one submission.
pub struct CvGenerator {
    catalog: TemplateCatalog,
    profiles: ProfileSet,
    fetcher: ImageFetcher,
    renderer: Arc<dyn DocumentRenderer>,
    converter: Arc<dyn FormatConverter>,
    default_template_id: Option<String>,
    strict_photo: bool,
}

impl CvGenerator {
    pub fn new(
        catalog: TemplateCatalog,
        profiles: ProfileSet,
        fetcher: ImageFetcher,
        renderer: Arc<dyn DocumentRenderer>,
        converter: Arc<dyn FormatConverter>,
    ) -> Self {
        Self {
            catalog,
            profiles,
            fetcher,
            renderer,
            converter,
            default_template_id: None,
            strict_photo: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, GenerateError> {
        let catalog = TemplateCatalog::load(&config.environment.templates_path)?;
        let fetcher = ImageFetcher::new(&config.fetch)?;
        let photo_key = config.profiles.default_profile().photo.key.clone();
        let converter = SofficeConverter::new(
            config.environment.soffice_path.clone(),
            Duration::from_secs(config.generation.convert_timeout_secs),
        );

        Ok(Self::new(
            catalog,
            config.profiles.clone(),
            fetcher,
            Arc::new(PptxRenderer::new(&photo_key)),
            Arc::new(converter),
        )
        .with_default_template(config.generation.default_template_id.clone())
        .with_strict_photo(config.generation.strict_photo))
    }

    pub fn with_default_template(mut self, id: Option<String>) -> Self {
        self.default_template_id = id;
        self
    }

    pub fn with_strict_photo(mut self, strict: bool) -> Self {
        self.strict_photo = strict;
        self
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    /// Template selector from the body or its envelope, using the default profile's aliases.
    pub fn template_selector(&self, submission: &Value) -> Option<String> {
        let profile = self.profiles.default_profile();
        let record = CanonicalRecord::build(submission, &profile);
        resolve_opt(record.record(), &selector_candidates(&profile))
    }

    /// Normalize only, with a named profile.
    pub async fn normalize(
        &self,
        submission: &Value,
        profile: Option<&str>,
    ) -> Result<NormalizationOutput, GenerateError> {
        let profile = self.profiles.get(profile)?;
        Ok(normalize(submission, &profile, &self.fetcher).await)
    }

    pub async fn generate(&self, submission: &Value) -> Result<GeneratedDocument, GenerateError> {
        self.generate_with(submission, None).await
    }

    /// Like [`generate`](Self::generate), with an explicit selector taking priority over the body.
    pub async fn generate_with(
        &self,
        submission: &Value,
        template_override: Option<&str>,
    ) -> Result<GeneratedDocument, GenerateError> {
        let selector = template_override
            .map(str::to_string)
            .or_else(|| self.template_selector(submission));
        let template = self
            .catalog
            .resolve(selector.as_deref(), self.default_template_id.as_deref())?;
        let profile = self.profiles.get(template.entry.profile.as_deref())?;

        app_log!(
            info,
            "Generating CV with template {} ({}), profile {}",
            template.entry.id,
            template.entry.file,
            template.entry.profile_name()
        );

        let output = normalize(submission, &profile, &self.fetcher).await;
        if let Some(err) = output.photo_outcome.error() {
            if self.strict_photo {
                return Err(GenerateError::Photo(err.clone()));
            }
            app_log!(warn, "Continuing without photo: {}", err);
        }

        let template_bytes = tokio::fs::read(&template.path).await?;
        let renderer = Arc::clone(&self.renderer);
        let fields = output.fields.clone();
        let document = tokio::task::spawn_blocking(move || renderer.render(&template_bytes, &fields))
            .await
            .map_err(|e| GenerateError::Io(std::io::Error::other(e)))??;

        let workspace = WorkspaceManager::new()?;
        let pdf = workspace
            .convert(&document, self.renderer.extension(), self.converter.as_ref())
            .await?;

        let filename = pdf_filename(output.fields.get(NAME_KEY), Utc::now().year());
        app_log!(
            info,
            "Generated {} ({} bytes, photo: {})",
            filename,
            pdf.len(),
            output.photo_outcome.label()
        );

        Ok(GeneratedDocument {
            pdf,
            filename,
            template_id: template.entry.id,
            photo: output.photo_outcome,
        })
    }
}

fn selector_candidates(profile: &PipelineConfig) -> Vec<String> {
    profile
        .fields
        .iter()
        .find(|field| field.key == SELECTOR_KEY)
        .map(|field| field.candidates())
        .unwrap_or_else(|| vec![SELECTOR_KEY.to_string(), "template".to_string()])
}
