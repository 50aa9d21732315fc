// src/error.rs
//! Error types for the generation pipeline.
//!
//! Field resolution never fails. Only these seams report errors:
//! photo acquisition (soft, see [`ImageError`]), template selection
//! ([`ConfigError`]), rendering ([`RenderError`]) and conversion ([`ConvertError`]).

use std::path::PathBuf;
use thiserror::Error;

/// Photo acquisition failure. Never aborts normalization by itself.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("Invalid image URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{scheme}' for '{url}'")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("Could not download image from '{url}': HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("Too many redirects (limit {limit}) while fetching '{url}'")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Transport error fetching '{url}': {reason}")]
    Transport { url: String, reason: String },

    #[error("Image rejected: {0}")]
    Rejected(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing template_id and no default template is configured")]
    MissingSelector,

    #[error("Invalid template_id: \"{raw}\". Expected a positive number")]
    InvalidSelector { raw: String },

    #[error("No template mapped for template_id={id}. Known ids: {known:?}")]
    UnknownTemplate { id: u32, known: Vec<u32> },

    #[error("Template file '{file}' not found in {dir}. Available: {}", .available.join(", "))]
    TemplateFileMissing {
        file: String,
        dir: PathBuf,
        available: Vec<String>,
    },

    #[error("Failed to load template catalog '{path}': {reason}")]
    Catalog { path: PathBuf, reason: String },

    #[error("Unknown normalization profile '{0}'")]
    UnknownProfile(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template is not a valid document archive: {0}")]
    InvalidTemplate(String),

    #[error("Failed to process template entry '{entry}': {reason}")]
    Entry { entry: String, reason: String },

    #[error("Unclosed placeholder in '{entry}' near \"{fragment}\"")]
    UnclosedTag { entry: String, fragment: String },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to start converter '{binary}': {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error converting to PDF.\nconverter: {binary}\nstderr: {stderr}\nstdout: {stdout}")]
    Failed {
        binary: PathBuf,
        stderr: String,
        stdout: String,
    },

    #[error("Converter '{binary}' did not finish within {secs}s")]
    Timeout { binary: PathBuf, secs: u64 },

    #[error("Converter did not produce the expected output: {path}")]
    MissingOutput { path: PathBuf },

    #[error("I/O error around conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level failure surfaced to the caller.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Photo acquisition failed: {0}")]
    Photo(#[from] ImageError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "TEMPLATE_CONFIG_ERROR",
            Self::Photo(_) => "PHOTO_ERROR",
            Self::Render(RenderError::UnclosedTag { .. }) => "TEMPLATE_TAG_ERROR",
            Self::Render(_) => "RENDER_ERROR",
            Self::Convert(_) => "CONVERSION_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Errors caused by the request itself rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Photo(_))
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(_) => vec![
                "Check the template_id value".to_string(),
                "List templates with GET /templates".to_string(),
            ],
            Self::Photo(_) => vec![
                "Send the photo as photo_base64".to_string(),
                "Make sure photo_url is publicly reachable".to_string(),
            ],
            Self::Render(_) => vec!["Run `cvpress check-template` on the template".to_string()],
            Self::Convert(_) => vec!["Verify SOFFICE_PATH points to a working office install".to_string()],
            Self::Io(_) => vec!["Try again in a few moments".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_carries_status() {
        let e = ImageError::Download {
            url: "https://example.com/a.png".into(),
            status: 404,
        };
        assert!(e.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_template_missing_lists_available() {
        let e = ConfigError::TemplateFileMissing {
            file: "x.pptx".into(),
            dir: PathBuf::from("templates"),
            available: vec!["a.pptx".into(), "b.pptx".into()],
        };
        assert!(e.to_string().contains("a.pptx, b.pptx"));
    }

    #[test]
    fn test_error_codes() {
        let e = GenerateError::from(RenderError::UnclosedTag {
            entry: "ppt/slides/slide1.xml".into(),
            fragment: "{{name".into(),
        });
        assert_eq!(e.code(), "TEMPLATE_TAG_ERROR");
        assert!(!e.is_client_error());

        let e = GenerateError::from(ConfigError::MissingSelector);
        assert_eq!(e.code(), "TEMPLATE_CONFIG_ERROR");
        assert!(e.is_client_error());
    }
}
