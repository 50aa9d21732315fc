// src/core/mod.rs
//! Normalization core and startup configuration

pub mod config_manager;
pub mod field_resolver;
pub mod pipeline;
pub mod shape;

pub use config_manager::{AppConfig, ConfigManager, ProfileSet};
pub use pipeline::{normalize, normalize_text};
pub use shape::{CanonicalRecord, SubmissionShape};
