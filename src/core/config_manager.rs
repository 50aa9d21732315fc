// src/core/config_manager.rs
//! Startup configuration: environment, `config.yaml` and env overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::image_acquisition::FetchConfig;

pub const DEFAULT_PROFILE: &str = "default";

/// Immutable application configuration, built once and shared.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub generation: GenerationConfig,
    pub profiles: ProfileSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(skip)]
    pub name: String,
    #[serde(default = "default_templates_path")]
    pub templates_path: PathBuf,
    #[serde(default = "default_soffice_path")]
    pub soffice_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
    pub json_limit_mib: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            address: "0.0.0.0".to_string(),
            json_limit_mib: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub default_template_id: Option<String>,
    /// Abort generation when a remote photo cannot be fetched.
    pub strict_photo: bool,
    pub convert_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_template_id: Some("1".to_string()),
            strict_photo: false,
            convert_timeout_secs: 120,
        }
    }
}

/// Named normalization profiles; `default` always exists.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    default: Arc<PipelineConfig>,
    named: BTreeMap<String, Arc<PipelineConfig>>,
}

impl ProfileSet {
    pub fn new(default: PipelineConfig) -> Self {
        Self {
            default: Arc::new(default),
            named: BTreeMap::new(),
        }
    }

    pub fn with_profile(mut self, name: &str, profile: PipelineConfig) -> Self {
        if name == DEFAULT_PROFILE {
            self.default = Arc::new(profile);
        } else {
            self.named.insert(name.to_string(), Arc::new(profile));
        }
        self
    }

    pub fn default_profile(&self) -> Arc<PipelineConfig> {
        Arc::clone(&self.default)
    }

    /// `None` and `"default"` both select the default profile.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<PipelineConfig>, ConfigError> {
        match name.map(str::trim) {
            None | Some("") | Some(DEFAULT_PROFILE) => Ok(self.default_profile()),
            Some(name) => self
                .named
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownProfile(name.to_string())),
        }
    }

    pub fn names(&self) -> Vec<String> {
        std::iter::once(DEFAULT_PROFILE.to_string())
            .chain(self.named.keys().cloned())
            .collect()
    }

    fn map_all(self, f: impl Fn(PipelineConfig) -> PipelineConfig) -> Self {
        let apply = |profile: Arc<PipelineConfig>| Arc::new(f((*profile).clone()));
        Self {
            default: apply(self.default),
            named: self
                .named
                .into_iter()
                .map(|(name, profile)| (name, apply(profile)))
                .collect(),
        }
    }
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    local: Option<EnvironmentConfig>,
    production: Option<EnvironmentConfig>,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default)]
    generation: GenerationConfig,
    #[serde(default)]
    profiles: BTreeMap<String, PipelineConfig>,
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("templates")
}

fn default_soffice_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files\LibreOffice\program\soffice.exe")
    } else {
        PathBuf::from("soffice")
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            templates_path: default_templates_path(),
            soffice_path: default_soffice_path(),
        }
    }
}

pub struct ConfigManager;

impl ConfigManager {
    /// Load from `CVPRESS_CONFIG` (default `config.yaml`) plus process env overrides.
    pub fn load() -> Result<AppConfig> {
        let path = std::env::var("CVPRESS_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from(Path::new(&path), |key| std::env::var(key).ok())
    }

    /// A missing file means built-in defaults; a malformed one is an error.
    pub fn load_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        let environment_name = env("ENVIRONMENT").unwrap_or_else(|| "local".to_string());
        info!("Loading configuration for environment: {}", environment_name);

        let file = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_yaml::from_str::<ConfigFile>(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            info!("{} not found, using built-in defaults", path.display());
            ConfigFile::default()
        };

        let ConfigFile {
            local,
            production,
            mut server,
            fetch,
            mut generation,
            profiles,
        } = file;

        let mut environment = match environment_name.as_str() {
            "production" => production.unwrap_or_else(|| EnvironmentConfig {
                templates_path: PathBuf::from("/app/templates"),
                ..EnvironmentConfig::default()
            }),
            _ => local.unwrap_or_default(),
        };
        environment.name = environment_name;

        let mut profile_set = profiles
            .into_iter()
            .fold(ProfileSet::default(), |set, (name, profile)| {
                set.with_profile(&name, profile)
            });

        if let Some(port) = env("PORT") {
            server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
        }
        if let Some(soffice) = env("SOFFICE_PATH").filter(|v| !v.trim().is_empty()) {
            environment.soffice_path = PathBuf::from(soffice);
        }
        if let Some(dir) = env("TEMPLATES_DIR").filter(|v| !v.trim().is_empty()) {
            environment.templates_path = PathBuf::from(dir);
        }
        if let Some(id) = env("DEFAULT_TEMPLATE_ID") {
            let id = id.trim().to_string();
            generation.default_template_id = (!id.is_empty()).then_some(id);
        }
        if let Some(flag) = env("CLAMP_ENABLED") {
            let enabled = parse_flag(&flag)
                .with_context(|| format!("CLAMP_ENABLED must be true or false, got '{}'", flag))?;
            profile_set = profile_set.map_all(|profile| profile.with_clamping(enabled));
        }

        environment.templates_path = resolve_path(&environment.templates_path)?;

        Ok(AppConfig {
            environment,
            server,
            fetch,
            generation,
            profiles: profile_set,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(current_dir.join(path))
    }
}

impl AppConfig {
    /// Built-in defaults with no file and no environment.
    pub fn defaults() -> Self {
        Self {
            environment: EnvironmentConfig::default(),
            server: ServerConfig::default(),
            fetch: FetchConfig::default(),
            generation: GenerationConfig::default(),
            profiles: ProfileSet::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ConfigManager::load_from(Path::new("/nonexistent/config.yaml"), env_from(&[])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.json_limit_mib, 60);
        assert_eq!(config.generation.default_template_id.as_deref(), Some("1"));
        assert_eq!(config.fetch.max_redirects, 5);
        assert!(config.environment.templates_path.is_absolute());
        assert!(config.profiles.default_profile().clamp_enabled);
    }

    #[test]
    fn test_yaml_file_and_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
local:
  templates_path: /srv/templates
server:
  port: 8080
fetch:
  max_redirects: 2
generation:
  strict_photo: true
profiles:
  compact:
    clamp_enabled: true
    envelope_keys: [payload]
"#
        )
        .unwrap();

        let config = ConfigManager::load_from(
            file.path(),
            env_from(&[
                ("PORT", "9000"),
                ("SOFFICE_PATH", "/opt/lo/soffice"),
                ("DEFAULT_TEMPLATE_ID", "  "),
                ("CLAMP_ENABLED", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.environment.templates_path, PathBuf::from("/srv/templates"));
        assert_eq!(config.environment.soffice_path, PathBuf::from("/opt/lo/soffice"));
        assert_eq!(config.fetch.max_redirects, 2);
        assert!(config.generation.strict_photo);
        assert!(config.generation.default_template_id.is_none());

        let compact = config.profiles.get(Some("compact")).unwrap();
        assert_eq!(compact.envelope_keys, vec!["payload"]);
        assert!(!compact.clamp_enabled);
        assert!(!config.profiles.default_profile().clamp_enabled);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = ConfigManager::load_from(Path::new("/nonexistent.yaml"), env_from(&[("PORT", "abc")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_profile() {
        let profiles = ProfileSet::default();
        assert!(profiles.get(None).is_ok());
        assert!(profiles.get(Some("default")).is_ok());
        assert!(matches!(
            profiles.get(Some("wide")),
            Err(ConfigError::UnknownProfile(name)) if name == "wide"
        ));
        assert_eq!(profiles.names(), vec!["default"]);
    }
}
