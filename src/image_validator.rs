// src/image_validator.rs
use tracing::warn;

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageValidationError {
    pub error_type: ImageErrorType,
    pub message: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageErrorType {
    EmptyFile,
    TooLarge,
    UnknownFormat,
}

impl ImageErrorType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyFile => "IMAGE_EMPTY",
            Self::TooLarge => "IMAGE_TOO_LARGE",
            Self::UnknownFormat => "IMAGE_UNKNOWN_FORMAT",
        }
    }
}

pub struct ImageValidator;

impl ImageValidator {
    /// Identify the image format from its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Result<ImageFormat, ImageValidationError> {
        if bytes.is_empty() {
            return Err(ImageValidationError {
                error_type: ImageErrorType::EmptyFile,
                message: "Photo payload is empty".to_string(),
                suggestion: "Please send a valid image".to_string(),
            });
        }

        if bytes.starts_with(PNG_SIGNATURE) {
            Ok(ImageFormat::Png)
        } else if bytes.starts_with(JPEG_SIGNATURE) {
            Ok(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Ok(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Ok(ImageFormat::Webp)
        } else {
            Err(ImageValidationError {
                error_type: ImageErrorType::UnknownFormat,
                message: "Photo is not a PNG, JPEG, GIF or WebP image".to_string(),
                suggestion: "Please use PNG or JPEG format".to_string(),
            })
        }
    }

    /// Reject empty, oversized or unrecognised payloads.
    pub fn validate(bytes: &[u8], max_bytes: usize) -> Result<ImageFormat, ImageValidationError> {
        if bytes.len() > max_bytes {
            return Err(ImageValidationError {
                error_type: ImageErrorType::TooLarge,
                message: format!(
                    "Photo too large: {:.1}MB (max {:.1}MB)",
                    bytes.len() as f64 / 1024.0 / 1024.0,
                    max_bytes as f64 / 1024.0 / 1024.0
                ),
                suggestion: "Please resize or compress the image and try again".to_string(),
            });
        }

        Self::sniff(bytes).map_err(|e| {
            warn!("{} ({} bytes)", e.message, bytes.len());
            e
        })
    }
}
