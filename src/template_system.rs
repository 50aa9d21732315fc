// src/template_system.rs
//! Template catalog: numeric template ids mapped to `.pptx` files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::config_manager::DEFAULT_PROFILE;
use crate::error::ConfigError;

pub const CATALOG_FILE: &str = "catalog.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub id: u32,
    pub file: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile: Option<String>,
}

impl TemplateEntry {
    fn builtin(id: u32, file: &str, description: &str) -> Self {
        Self {
            id,
            file: file.to_string(),
            description: description.to_string(),
            profile: None,
        }
    }

    pub fn profile_name(&self) -> &str {
        self.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "template")]
    templates: Vec<TemplateEntry>,
}

/// A catalog entry whose file was found on disk.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub entry: TemplateEntry,
    pub path: PathBuf,
}

/// Listing row for `GET /templates`.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub id: u32,
    pub file: String,
    pub description: String,
    pub profile: String,
    pub available: bool,
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates_dir: PathBuf,
    entries: BTreeMap<u32, TemplateEntry>,
}

impl TemplateCatalog {
    /// Read `catalog.toml` from `templates_dir`, or fall back to the built-in catalog.
    pub fn load(templates_dir: &Path) -> Result<Self, ConfigError> {
        let catalog_path = templates_dir.join(CATALOG_FILE);

        let entries = if catalog_path.exists() {
            let content = fs::read_to_string(&catalog_path).map_err(|e| ConfigError::Catalog {
                path: catalog_path.clone(),
                reason: e.to_string(),
            })?;
            let parsed: CatalogFile = toml::from_str(&content).map_err(|e| ConfigError::Catalog {
                path: catalog_path.clone(),
                reason: e.to_string(),
            })?;
            info!(
                "Loaded {} templates from {}",
                parsed.templates.len(),
                catalog_path.display()
            );
            parsed.templates
        } else {
            info!(
                "No {} in {}, using built-in catalog",
                CATALOG_FILE,
                templates_dir.display()
            );
            Self::builtin_entries()
        };

        Ok(Self::from_entries(templates_dir, entries))
    }

    pub fn from_entries(templates_dir: &Path, entries: Vec<TemplateEntry>) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.id == 0 {
                warn!("Ignoring template entry with id 0 ({})", entry.file);
                continue;
            }
            if let Some(previous) = map.insert(entry.id, entry) {
                warn!("Duplicate template id {}, replacing {}", previous.id, previous.file);
            }
        }

        Self {
            templates_dir: templates_dir.to_path_buf(),
            entries: map,
        }
    }

    fn builtin_entries() -> Vec<TemplateEntry> {
        vec![
            TemplateEntry::builtin(1, "Plantilla_oficial_1_verde.pptx", "Official green layout"),
            TemplateEntry::builtin(2, "Template_2_moderno.pptx", "Modern layout"),
            TemplateEntry::builtin(3, "Template_3_oficial.pptx", "Official layout, variant 3"),
            TemplateEntry::builtin(
                10,
                "Currículum Vitae Cv de Marketing Minimalista Beige (2).pptx",
                "Minimal beige marketing layout",
            ),
        ]
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn ids(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    pub fn get(&self, id: u32) -> Option<&TemplateEntry> {
        self.entries.get(&id)
    }

    /// Resolve a raw selector, falling back to `default` when it is blank.
    pub fn resolve(
        &self,
        selector: Option<&str>,
        default: Option<&str>,
    ) -> Result<ResolvedTemplate, ConfigError> {
        let raw = selector
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| default.map(str::trim).filter(|s| !s.is_empty()))
            .ok_or(ConfigError::MissingSelector)?;

        let id = parse_selector(raw)?;
        let entry = self
            .entries
            .get(&id)
            .ok_or_else(|| ConfigError::UnknownTemplate {
                id,
                known: self.ids(),
            })?;

        let path = self.templates_dir.join(&entry.file);
        if !path.is_file() {
            return Err(ConfigError::TemplateFileMissing {
                file: entry.file.clone(),
                dir: self.templates_dir.clone(),
                available: self.available_files(),
            });
        }

        Ok(ResolvedTemplate {
            entry: entry.clone(),
            path,
        })
    }

    /// `.pptx` files present in the templates directory, sorted.
    pub fn available_files(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.templates_dir) else {
            return Vec::new();
        };

        let mut files: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.to_lowercase().ends_with(".pptx"))
            .collect();
        files.sort();
        files
    }

    pub fn list(&self) -> Vec<TemplateInfo> {
        self.entries
            .values()
            .map(|entry| TemplateInfo {
                id: entry.id,
                file: entry.file.clone(),
                description: entry.description.clone(),
                profile: entry.profile_name().to_string(),
                available: self.templates_dir.join(&entry.file).is_file(),
            })
            .collect()
    }
}

fn parse_selector(raw: &str) -> Result<u32, ConfigError> {
    // "2.0" and "02" both arrive from spreadsheet-backed forms
    let number: f64 = raw.parse().map_err(|_| ConfigError::InvalidSelector {
        raw: raw.to_string(),
    })?;
    if !number.is_finite() || number < 1.0 || number.fract() != 0.0 || number > u32::MAX as f64 {
        return Err(ConfigError::InvalidSelector {
            raw: raw.to_string(),
        });
    }
    Ok(number as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"PK").unwrap();
        }
        dir
    }

    #[test]
    fn test_builtin_catalog_when_no_file() {
        let dir = dir_with(&["Template_2_moderno.pptx"]);
        let catalog = TemplateCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.ids(), vec![1, 2, 3, 10]);

        let resolved = catalog.resolve(Some(" 2 "), None).unwrap();
        assert_eq!(resolved.entry.file, "Template_2_moderno.pptx");
        assert_eq!(resolved.entry.profile_name(), "default");
    }

    #[test]
    fn test_catalog_file_is_read() {
        let dir = dir_with(&["a.pptx"]);
        fs::write(
            dir.path().join(CATALOG_FILE),
            "[[template]]\nid = 7\nfile = \"a.pptx\"\ndescription = \"A\"\nprofile = \"compact\"\n",
        )
        .unwrap();

        let catalog = TemplateCatalog::load(dir.path()).unwrap();
        let resolved = catalog.resolve(None, Some("7")).unwrap();
        assert_eq!(resolved.entry.profile_name(), "compact");
        assert!(resolved.path.ends_with("a.pptx"));
        assert!(catalog.list()[0].available);
    }

    #[test]
    fn test_malformed_catalog_is_config_error() {
        let dir = dir_with(&[]);
        fs::write(dir.path().join(CATALOG_FILE), "[[template]]\nid = \"x\"\n").unwrap();
        assert!(matches!(
            TemplateCatalog::load(dir.path()),
            Err(ConfigError::Catalog { .. })
        ));
    }

    #[test]
    fn test_selector_errors() {
        let dir = dir_with(&["other.pptx"]);
        let catalog = TemplateCatalog::load(dir.path()).unwrap();

        assert!(matches!(catalog.resolve(None, None), Err(ConfigError::MissingSelector)));
        assert!(matches!(catalog.resolve(Some("  "), Some("")), Err(ConfigError::MissingSelector)));
        assert!(matches!(
            catalog.resolve(Some("abc"), None),
            Err(ConfigError::InvalidSelector { .. })
        ));
        assert!(matches!(
            catalog.resolve(Some("0"), None),
            Err(ConfigError::InvalidSelector { .. })
        ));
        assert!(matches!(
            catalog.resolve(Some("5"), None),
            Err(ConfigError::UnknownTemplate { id: 5, .. })
        ));
        match catalog.resolve(Some("1.0"), None) {
            Err(ConfigError::TemplateFileMissing { available, .. }) => {
                assert_eq!(available, vec!["other.pptx"]);
            }
            other => panic!("expected missing file, got {other:?}"),
        }
    }
}
