// src/config.rs
//! Normalization profile: schema keys, aliases and space budgets.
//!
//! A profile is built once (defaults or `config.yaml`) and shared read-only
//! across requests. Nothing in the pipeline reads ambient configuration.

use serde::{Deserialize, Serialize};

use crate::text_fit::Fit;

const fn plain(max_chars: usize) -> Fit {
    Fit::Plain { max_chars }
}

const fn wrapped(chars_per_line: usize, max_lines: usize) -> Fit {
    Fit::Wrapped {
        chars_per_line,
        max_lines,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A scalar schema key resolved from a list of aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub aliases: Vec<String>,
    pub fit: Fit,
}

impl FieldSpec {
    pub fn new(key: &str, aliases: &[&str], fit: Fit) -> Self {
        Self {
            key: key.to_string(),
            aliases: strings(aliases),
            fit,
        }
    }

    /// The output key itself always comes first.
    pub fn candidates(&self) -> Vec<String> {
        let mut keys = vec![self.key.clone()];
        keys.extend(self.aliases.iter().filter(|a| **a != self.key).cloned());
        keys
    }
}

/// Start/end keys composed into a "start - end" range when no direct value exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeSpec {
    pub start_keys: Vec<String>,
    pub end_keys: Vec<String>,
}

/// A sub-field inside a repeated block (experience, education, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubFieldSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub fit: Fit,
    #[serde(default)]
    pub range: Option<RangeSpec>,
}

impl SubFieldSpec {
    pub fn new(name: &str, aliases: &[&str], fit: Fit) -> Self {
        Self {
            name: name.to_string(),
            aliases: strings(aliases),
            fit,
            range: None,
        }
    }

    pub fn with_range(mut self, start_keys: &[&str], end_keys: &[&str]) -> Self {
        self.range = Some(RangeSpec {
            start_keys: strings(start_keys),
            end_keys: strings(end_keys),
        });
        self
    }

    /// Names looked up inside an array entry; the canonical name first.
    pub fn entry_keys(&self) -> Vec<String> {
        let mut keys = vec![self.name.clone()];
        keys.extend(self.aliases.iter().filter(|a| **a != self.name).cloned());
        keys
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletSpec {
    pub array_keys: Vec<String>,
    pub max_count: usize,
    pub fit: Fit,
}

/// A repeated block rendered as `{prefix}_{n}_{sub}` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSpec {
    pub prefix: String,
    pub array_keys: Vec<String>,
    pub max_count: usize,
    pub fields: Vec<SubFieldSpec>,
    #[serde(default)]
    pub bullets: Option<BulletSpec>,
}

impl BlockSpec {
    pub fn field_key(&self, index: usize, name: &str) -> String {
        format!("{}_{}_{}", self.prefix, index, name)
    }

    pub fn bullet_key(&self, index: usize, bullet: usize) -> String {
        format!("{}_{}_b{}", self.prefix, index, bullet)
    }

    /// Flat keys that may carry a sub-field for block `index`, output key first.
    pub fn flat_candidates(&self, index: usize, field: &SubFieldSpec) -> Vec<String> {
        field
            .entry_keys()
            .iter()
            .map(|alias| self.field_key(index, alias))
            .collect()
    }
}

/// A fixed-size list (skills, languages, ...) rendered as `{prefix}{i}` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSpec {
    pub prefix: String,
    pub slot_count: usize,
    pub list_keys: Vec<String>,
    pub item_prefixes: Vec<String>,
    pub free_text_keys: Vec<String>,
    pub fit: Fit,
}

impl ListSpec {
    pub fn slot_key(&self, slot: usize) -> String {
        format!("{}{}", self.prefix, slot)
    }
}

/// A nested object whose children are lifted into the flat record under `prefix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedGroup {
    pub keys: Vec<String>,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSpec {
    pub key: String,
    pub inline_keys: Vec<String>,
    pub url_keys: Vec<String>,
}

impl Default for PhotoSpec {
    fn default() -> Self {
        Self {
            key: "photo".to_string(),
            inline_keys: strings(&["photo_base64", "foto_base64"]),
            url_keys: strings(&["photo_url", "photo", "archivos_main", "foto_url"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub clamp_enabled: bool,
    pub envelope_keys: Vec<String>,
    pub nested_groups: Vec<NestedGroup>,
    pub fields: Vec<FieldSpec>,
    pub blocks: Vec<BlockSpec>,
    pub lists: Vec<ListSpec>,
    pub photo: PhotoSpec,
}

impl PipelineConfig {
    pub fn with_clamping(mut self, enabled: bool) -> Self {
        self.clamp_enabled = enabled;
        self
    }

    /// Every text key the pipeline guarantees to emit, in schema order.
    pub fn schema_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.fields.iter().map(|f| f.key.clone()).collect();

        for block in &self.blocks {
            for index in 1..=block.max_count {
                keys.extend(block.fields.iter().map(|f| block.field_key(index, &f.name)));
                if let Some(bullets) = &block.bullets {
                    keys.extend((1..=bullets.max_count).map(|b| block.bullet_key(index, b)));
                }
            }
        }

        for list in &self.lists {
            keys.extend((1..=list.slot_count).map(|slot| list.slot_key(slot)));
        }

        keys
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let fields = vec![
            FieldSpec::new("template_id", &["template", "Plantilla de CV"], Fit::Raw),
            FieldSpec::new(
                "name",
                &["Nombre completo", "full_name", "nombre"],
                wrapped(22, 2),
            ),
            FieldSpec::new(
                "title",
                &["Objetivo / rol buscado", "Puesto", "role"],
                wrapped(28, 2),
            ),
            FieldSpec::new(
                "about",
                &["Resumen profesional", "summary", "resumen"],
                wrapped(80, 6),
            ),
            FieldSpec::new(
                "contact_phone",
                &["Telefono", "Teléfono", "phone", "contact_telefono"],
                plain(22),
            ),
            FieldSpec::new("contact_email", &["Email", "email", "contact_correo"], plain(60)),
            FieldSpec::new(
                "contact_location",
                &["Ubicacion", "Ubicación", "location", "contact_ubicacion"],
                wrapped(40, 2),
            ),
            FieldSpec::new(
                "contact_website",
                &[
                    "Linkedin",
                    "Portfolio",
                    "GITHUB",
                    "website",
                    "contact_linkedin",
                ],
                plain(80),
            ),
        ];

        let experience = BlockSpec {
            prefix: "exp".to_string(),
            array_keys: strings(&["experience", "experiencia", "work_experience"]),
            max_count: 2,
            fields: vec![
                SubFieldSpec::new("company", &["empresa", "employer"], wrapped(26, 2)),
                SubFieldSpec::new("role", &["puesto", "cargo", "title", "position"], wrapped(30, 2)),
                SubFieldSpec::new("dates", &["fechas", "period", "periodo"], plain(30))
                    .with_range(&["start", "start_date", "desde"], &["end", "end_date", "hasta"]),
            ],
            bullets: Some(BulletSpec {
                array_keys: strings(&["bullets", "logros", "responsibilities", "highlights"]),
                max_count: 3,
                fit: wrapped(42, 2),
            }),
        };

        let education = BlockSpec {
            prefix: "edu".to_string(),
            array_keys: strings(&["education", "educacion", "educación"]),
            max_count: 2,
            fields: vec![
                SubFieldSpec::new(
                    "school",
                    &["institution", "institucion", "institución"],
                    wrapped(34, 2),
                ),
                SubFieldSpec::new(
                    "degree",
                    &["program", "programa", "titulo", "título"],
                    wrapped(34, 2),
                ),
                SubFieldSpec::new("years", &["dates", "fechas", "anios", "años"], plain(40))
                    .with_range(&["start", "start_date", "desde"], &["end", "end_date", "hasta"]),
            ],
            bullets: None,
        };

        let references = BlockSpec {
            prefix: "ref".to_string(),
            array_keys: strings(&["references", "referencias"]),
            max_count: 2,
            fields: vec![
                SubFieldSpec::new("name", &["nombre"], wrapped(30, 2)),
                SubFieldSpec::new("role", &["cargo", "puesto", "company", "empresa"], wrapped(30, 2)),
                SubFieldSpec::new("contact", &["contacto", "phone", "email"], plain(40)),
            ],
            bullets: None,
        };

        let list = |prefix: &str,
                    slot_count: usize,
                    list_keys: &[&str],
                    item_prefixes: &[&str],
                    free_text_keys: &[&str],
                    fit: Fit| ListSpec {
            prefix: prefix.to_string(),
            slot_count,
            list_keys: strings(list_keys),
            item_prefixes: strings(item_prefixes),
            free_text_keys: strings(free_text_keys),
            fit,
        };

        let lists = vec![
            list(
                "skill_",
                7,
                &["skills", "habilidades"],
                &["skill_", "habilidad_"],
                &["skills_raw", "habilidades_raw"],
                plain(26),
            ),
            list(
                "language_",
                3,
                &["languages", "idiomas"],
                &["language_", "idioma_"],
                &["languages_raw", "idiomas_raw"],
                plain(26),
            ),
            list(
                "it_",
                4,
                &["it_tools", "informatica"],
                &["it_", "informatica_"],
                &["it_raw", "informatica_raw"],
                plain(26),
            ),
            list(
                "course_",
                3,
                &["courses", "cursos"],
                &["course_", "curso_"],
                &["courses_raw", "cursos_raw"],
                wrapped(34, 2),
            ),
        ];

        Self {
            clamp_enabled: true,
            envelope_keys: strings(&["data", "fields"]),
            nested_groups: vec![
                NestedGroup {
                    keys: strings(&["contact", "contacto"]),
                    prefix: "contact_".to_string(),
                },
                NestedGroup {
                    keys: strings(&["personal_info", "personal"]),
                    prefix: String::new(),
                },
            ],
            fields,
            blocks: vec![experience, education, references],
            lists,
            photo: PhotoSpec::default(),
        }
    }
}
