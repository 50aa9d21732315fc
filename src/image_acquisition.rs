// src/image_acquisition.rs
//! Photo acquisition from an inline base64 payload or a remote URL.

use async_recursion::async_recursion;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_log;
use crate::error::ImageError;
use crate::image_validator::ImageValidator;

const DRIVE_DOWNLOAD_PREFIX: &str = "https://drive.google.com/uc?export=download&id=";

static DATA_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^data:[^,]*;base64,(.*)$").expect("data uri pattern"));

static DRIVE_FILE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"drive\.google\.com/file/d/([a-zA-Z0-9_-]+)").expect("drive file pattern")
});

static DRIVE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"drive\.google\.com/open\?id=([a-zA-Z0-9_-]+)").expect("drive open pattern")
});

static DRIVE_QUERY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:drive|docs)\.google\.com/[^#]*[?&]id=([a-zA-Z0-9_-]+)")
        .expect("drive query pattern")
});

/// Decode an inline photo, with or without a `data:<type>;base64,` header.
///
/// Returns `None` for empty input or anything that does not decode.
pub fn decode_inline(value: &str) -> Option<Vec<u8>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let payload = DATA_URI
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }

    [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(&cleaned).ok())
        .filter(|bytes| !bytes.is_empty())
}

/// Rewrite a Google Drive share link to its direct-download form.
///
/// Handles `/file/d/<id>`, `/open?id=<id>` and any Drive URL carrying `?id=<id>`.
/// Everything else passes through unchanged.
pub fn normalize_share_url(url: &str) -> String {
    let trimmed = url.trim();

    let id = [&*DRIVE_FILE_PATH, &*DRIVE_OPEN, &*DRIVE_QUERY_ID]
        .iter()
        .find_map(|pattern| pattern.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    match id {
        Some(id) => format!("{}{}", DRIVE_DOWNLOAD_PREFIX, id),
        None => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_redirects: usize,
    /// Zero disables the client-side timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            timeout_secs: 20,
            user_agent: "Mozilla/5.0 (CV-Generator)".to_string(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// HTTP(S) downloader that follows a bounded number of redirects itself.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_redirects: usize,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, ImageError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.clone());
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| ImageError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
            max_bytes: config.max_bytes,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// GET `url`, following redirects, and return the final 200 body.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        self.fetch_following(url.trim().to_string(), self.max_redirects)
            .await
    }

    #[async_recursion]
    async fn fetch_following(&self, url: String, hops_left: usize) -> Result<Vec<u8>, ImageError> {
        let parsed = Url::parse(&url).map_err(|e| ImageError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageError::UnsupportedScheme {
                scheme: parsed.scheme().to_string(),
                url,
            });
        }

        let mut response = self
            .client
            .get(parsed.clone())
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| ImageError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_redirection() {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                if hops_left == 0 {
                    return Err(ImageError::TooManyRedirects {
                        url,
                        limit: self.max_redirects,
                    });
                }
                let next = parsed.join(location).map_err(|e| ImageError::InvalidUrl {
                    url: location.to_string(),
                    reason: e.to_string(),
                })?;
                app_log!(debug, "Photo fetch redirected ({}): {} -> {}", status, url, next);
                return self.fetch_following(next.to_string(), hops_left - 1).await;
            }
        }

        if status != StatusCode::OK {
            return Err(ImageError::Download {
                url,
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(ImageError::Rejected(format!(
                    "{} declares {} bytes, limit is {}",
                    url, length, self.max_bytes
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| ImageError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        })? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(ImageError::Rejected(format!(
                    "{} exceeds the {} byte limit",
                    url, self.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Raw photo inputs resolved from the submission.
#[derive(Debug, Clone, Default)]
pub struct PhotoSources {
    pub inline: String,
    pub url: String,
}

impl PhotoSources {
    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.url.is_empty()
    }
}

/// Where the photo came from, or why there is none.
#[derive(Debug, Clone)]
pub enum PhotoOutcome {
    Inline,
    Remote { url: String },
    Absent,
    Failed(ImageError),
}

impl PhotoOutcome {
    pub fn error(&self) -> Option<&ImageError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Remote { .. } => "remote",
            Self::Absent => "absent",
            Self::Failed(_) => "failed",
        }
    }
}

/// Inline payload first, remote URL second; failures leave the photo empty.
///
/// An inline payload that decodes but is not a usable image does not block the URL.
pub async fn resolve_photo(
    sources: &PhotoSources,
    fetcher: &ImageFetcher,
) -> (Option<Vec<u8>>, PhotoOutcome) {
    let mut inline_error = None;
    if !sources.inline.is_empty() {
        match decode_inline(&sources.inline) {
            Some(bytes) => match check_image(&bytes, fetcher.max_bytes()) {
                Ok(()) => return (Some(bytes), PhotoOutcome::Inline),
                Err(e) => {
                    app_log!(warn, "Inline photo rejected, trying photo URL: {}", e);
                    inline_error = Some(e);
                }
            },
            None => app_log!(warn, "Inline photo could not be decoded, trying photo URL"),
        }
    }

    let unresolved = |error: Option<ImageError>| -> (Option<Vec<u8>>, PhotoOutcome) {
        (None, error.map_or(PhotoOutcome::Absent, PhotoOutcome::Failed))
    };

    if sources.url.is_empty() {
        return unresolved(inline_error);
    }

    if sources.url.trim_start().starts_with("data:") {
        return match decode_inline(&sources.url) {
            Some(bytes) => accept(bytes, PhotoOutcome::Inline, fetcher.max_bytes()),
            None => unresolved(inline_error),
        };
    }

    let url = normalize_share_url(&sources.url);
    match fetcher.fetch_bytes(&url).await {
        Ok(bytes) if bytes.is_empty() => (
            None,
            PhotoOutcome::Failed(ImageError::Rejected(format!("empty body from {}", url))),
        ),
        Ok(bytes) => accept(bytes, PhotoOutcome::Remote { url }, fetcher.max_bytes()),
        Err(e) => {
            app_log!(warn, "Photo download failed: {}", e);
            (None, PhotoOutcome::Failed(e))
        }
    }
}

fn check_image(bytes: &[u8], max_bytes: usize) -> Result<(), ImageError> {
    ImageValidator::validate(bytes, max_bytes)
        .map(|_| ())
        .map_err(|e| ImageError::Rejected(format!("{} ({})", e.message, e.error_type.code())))
}

fn accept(bytes: Vec<u8>, outcome: PhotoOutcome, max_bytes: usize) -> (Option<Vec<u8>>, PhotoOutcome) {
    match check_image(&bytes, max_bytes) {
        Ok(()) => (Some(bytes), outcome),
        Err(e) => {
            app_log!(warn, "Photo rejected: {}", e);
            (None, PhotoOutcome::Failed(e))
        }
    }
}
