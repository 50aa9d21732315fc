pub mod cli;
pub mod config;
pub mod converter;
pub mod core;
pub mod error;
pub mod generator;
pub mod image_acquisition;
pub mod image_validator;
pub mod logging;
pub mod template_check;
pub mod template_processor;
pub mod template_system;
pub mod text_fit;
pub mod types;
pub mod utils;
pub mod web;
pub mod workspace;

pub use config::PipelineConfig;
pub use core::{normalize, normalize_text, AppConfig, ConfigManager, ProfileSet, SubmissionShape};
pub use error::{ConfigError, ConvertError, GenerateError, ImageError, RenderError};
pub use generator::{CvGenerator, GeneratedDocument};
pub use image_acquisition::{FetchConfig, ImageFetcher, PhotoOutcome};
pub use template_check::{check_template, TemplateReport};
pub use template_processor::{DocumentRenderer, PptxRenderer};
pub use types::{NormalizationOutput, NormalizationReport, NormalizedFields};
pub use web::start_web_server;
