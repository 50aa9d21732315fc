// src/template_processor.rs
//! PPTX placeholder renderer: `{{key}}` text slots and a `{{%photo}}` image slot.

use once_cell::sync::Lazy;
use quick_xml::escape::{escape, unescape};
use regex::{Captures, Regex};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::app_log;
use crate::error::RenderError;
use crate::image_validator::{ImageFormat, ImageValidator};
use crate::types::NormalizedFields;

pub const OPEN_MARKER: &str = "{{";
pub const CLOSE_MARKER: &str = "}}";

const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";
const PHOTO_REL_ID: &str = "rIdCvPhoto";
const PHOTO_MEDIA_STEM: &str = "cvpress_photo";
const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
/// 220px at 96 dpi.
const DEFAULT_PHOTO_EMU: u64 = 220 * 9525;
const FRAGMENT_CHARS: usize = 40;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static template pattern")
}

static SLIDE_ENTRY: Lazy<Regex> = Lazy::new(|| pattern(r"^ppt/slides/slide\d+\.xml$"));
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| pattern(r"(?s)(<a:p(?:\s[^>]*)?>)(.*?)</a:p>"));
static TEXT_OR_BREAK: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>|<a:br\b(?:[^>]*/>|[^>]*>.*?</a:br>)")
});
static RUN_PROPS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?s)<a:rPr\b(?:[^>]*/>|[^>]*>.*?</a:rPr>)"));
static PARA_PROPS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?s)<a:pPr\b(?:[^>]*/>|[^>]*>.*?</a:pPr>)"));
static END_PARA_PROPS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?s)<a:endParaRPr\b(?:[^>]*/>|[^>]*>.*?</a:endParaRPr>)"));
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| pattern(r"\{\{\s*(%?)\s*([^{}]*?)\s*\}\}"));
static SHAPE: Lazy<Regex> = Lazy::new(|| pattern(r"(?s)<p:sp(?:\s[^>]*)?>.*?</p:sp>"));
static SHAPE_ID: Lazy<Regex> = Lazy::new(|| pattern(r#"<p:cNvPr\b[^>]*\sid="(\d+)""#));
static OFFSET: Lazy<Regex> = Lazy::new(|| pattern(r#"<a:off\s+x="(-?\d+)"\s+y="(-?\d+)""#));
static EXTENT: Lazy<Regex> = Lazy::new(|| pattern(r#"<a:ext\s+cx="(\d+)"\s+cy="(\d+)""#));

/// Turns a template plus normalized fields into a populated document.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, template: &[u8], fields: &NormalizedFields) -> Result<Vec<u8>, RenderError>;

    /// File extension of the rendered document, without the dot.
    fn extension(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct PptxRenderer {
    photo_key: String,
}

impl Default for PptxRenderer {
    fn default() -> Self {
        Self::new("photo")
    }
}

struct ArchiveEntry {
    name: String,
    options: FileOptions,
    data: Option<Vec<u8>>,
}

struct PhotoMedia<'a> {
    bytes: &'a [u8],
    format: ImageFormat,
}

impl PhotoMedia<'_> {
    fn entry_name(&self) -> String {
        format!("ppt/media/{}.{}", PHOTO_MEDIA_STEM, self.format.extension())
    }

    fn rel_target(&self) -> String {
        format!("../media/{}.{}", PHOTO_MEDIA_STEM, self.format.extension())
    }
}

impl DocumentRenderer for PptxRenderer {
    fn render(&self, template: &[u8], fields: &NormalizedFields) -> Result<Vec<u8>, RenderError> {
        let mut entries = read_entries(template)?;

        let photo = fields.photo().map(|bytes| PhotoMedia {
            bytes,
            format: ImageValidator::sniff(bytes).unwrap_or_else(|e| {
                app_log!(warn, "{}; embedding photo as PNG", e.message);
                ImageFormat::Png
            }),
        });

        let mut photo_slides = Vec::new();
        for entry in entries.iter_mut().filter(|e| SLIDE_ENTRY.is_match(&e.name)) {
            let Some(data) = entry.data.take() else {
                continue;
            };
            let xml = String::from_utf8(data).map_err(|e| RenderError::Entry {
                entry: entry.name.clone(),
                reason: e.to_string(),
            })?;

            let (rendered, photo_placed) = self.render_slide(&entry.name, &xml, fields, photo.is_some())?;
            if photo_placed {
                photo_slides.push(entry.name.clone());
            }
            entry.data = Some(rendered.into_bytes());
        }

        if let Some(media) = photo.filter(|_| !photo_slides.is_empty()) {
            embed_photo(&mut entries, &photo_slides, &media)?;
            app_log!(
                debug,
                "Embedded {} photo ({} bytes) in {} slide(s)",
                media.format.extension(),
                media.bytes.len(),
                photo_slides.len()
            );
        }

        write_entries(entries)
    }

    fn extension(&self) -> &'static str {
        "pptx"
    }
}

impl PptxRenderer {
    pub fn new(photo_key: &str) -> Self {
        Self {
            photo_key: photo_key.to_string(),
        }
    }

    /// Returns the rendered slide and whether the photo slot was turned into a picture.
    fn render_slide(
        &self,
        entry: &str,
        xml: &str,
        fields: &NormalizedFields,
        has_photo: bool,
    ) -> Result<(String, bool), RenderError> {
        let mut photo_placed = false;

        let xml = if has_photo {
            SHAPE
                .replace_all(xml, |caps: &Captures| {
                    let shape = &caps[0];
                    if !photo_placed && self.is_photo_slot(&merged_text(shape)) {
                        photo_placed = true;
                        picture_xml(shape)
                    } else {
                        shape.to_string()
                    }
                })
                .into_owned()
        } else {
            xml.to_string()
        };

        let mut out = String::with_capacity(xml.len());
        let mut last = 0;
        for caps in PARAGRAPH.captures_iter(&xml) {
            let (Some(whole), Some(open), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            out.push_str(&xml[last..whole.start()]);
            match render_paragraph(entry, open.as_str(), body.as_str(), fields)? {
                Some(rendered) => out.push_str(&rendered),
                None => out.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        out.push_str(&xml[last..]);

        Ok((out, photo_placed))
    }

    fn is_photo_slot(&self, text: &str) -> bool {
        PLACEHOLDER
            .captures_iter(text)
            .any(|caps| &caps[1] == "%" && &caps[2] == self.photo_key)
    }
}

/// Position of the first `{{` that is never closed, or is followed by another `{{` first.
pub fn find_unclosed(text: &str) -> Option<usize> {
    let mut cursor = 0;
    while let Some(relative) = text[cursor..].find(OPEN_MARKER) {
        let open = cursor + relative;
        let after = open + OPEN_MARKER.len();
        match text[after..].find(CLOSE_MARKER) {
            None => return Some(open),
            Some(relative_close) => {
                let close = after + relative_close;
                if text[after..close].contains(OPEN_MARKER) {
                    return Some(open);
                }
                cursor = close + CLOSE_MARKER.len();
            }
        }
    }
    None
}

pub fn fragment_at(text: &str, position: usize) -> String {
    text[position..].chars().take(FRAGMENT_CHARS).collect()
}

/// Concatenated, unescaped text of every `<a:t>` run in `xml`; `<a:br>` becomes `\n`.
pub fn merged_text(xml: &str) -> String {
    TEXT_OR_BREAK
        .captures_iter(xml)
        .map(|caps| match caps.get(1) {
            Some(raw) => unescape(raw.as_str())
                .map(|text| text.into_owned())
                .unwrap_or_else(|_| raw.as_str().to_string()),
            None => "\n".to_string(),
        })
        .collect()
}

fn render_paragraph(
    entry: &str,
    open_tag: &str,
    body: &str,
    fields: &NormalizedFields,
) -> Result<Option<String>, RenderError> {
    let merged = merged_text(body);
    if !merged.contains(OPEN_MARKER) {
        return Ok(None);
    }
    if let Some(position) = find_unclosed(&merged) {
        return Err(RenderError::UnclosedTag {
            entry: entry.to_string(),
            fragment: fragment_at(&merged, position),
        });
    }

    let text = PLACEHOLDER.replace_all(&merged, |caps: &Captures| {
        if &caps[1] == "%" {
            String::new()
        } else {
            fields.get(&caps[2]).to_string()
        }
    });

    let para_props = PARA_PROPS.find(body).map_or("", |m| m.as_str());
    let run_props = RUN_PROPS.find(body).map_or("", |m| m.as_str());
    let end_props = END_PARA_PROPS.find(body).map_or("", |m| m.as_str());

    let mut out = String::with_capacity(body.len() + text.len());
    out.push_str(open_tag);
    out.push_str(para_props);
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            if run_props.is_empty() {
                out.push_str("<a:br/>");
            } else {
                out.push_str("<a:br>");
                out.push_str(run_props);
                out.push_str("</a:br>");
            }
        }
        if !line.is_empty() {
            out.push_str("<a:r>");
            out.push_str(run_props);
            out.push_str("<a:t>");
            out.push_str(&escape(line));
            out.push_str("</a:t></a:r>");
        }
    }
    out.push_str(end_props);
    out.push_str("</a:p>");

    Ok(Some(out))
}

fn picture_xml(shape: &str) -> String {
    let id = SHAPE_ID
        .captures(shape)
        .and_then(|caps| caps.get(1))
        .map_or("1000", |m| m.as_str());
    let (x, y) = OFFSET
        .captures(shape)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .unwrap_or_else(|| ("0".to_string(), "0".to_string()));
    let (cx, cy) = EXTENT
        .captures(shape)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .unwrap_or_else(|| (DEFAULT_PHOTO_EMU.to_string(), DEFAULT_PHOTO_EMU.to_string()));

    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Photo {id}"/>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
        ),
        id = id,
        rel = PHOTO_REL_ID,
        x = x,
        y = y,
        cx = cx,
        cy = cy,
    )
}

fn embed_photo(
    entries: &mut Vec<ArchiveEntry>,
    slides: &[String],
    media: &PhotoMedia<'_>,
) -> Result<(), RenderError> {
    let options = FileOptions::default();

    for slide in slides {
        let file_name = slide.rsplit('/').next().unwrap_or(slide.as_str());
        let rels_name = format!("ppt/slides/_rels/{}.rels", file_name);

        match entries.iter_mut().find(|e| e.name == rels_name) {
            Some(rels) => {
                let xml = entry_text(rels)?;
                let updated = add_relationship(&rels_name, &xml, &media.rel_target())?;
                rels.data = Some(updated.into_bytes());
            }
            None => entries.push(ArchiveEntry {
                name: rels_name,
                options,
                data: Some(
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}">{}</Relationships>"#,
                        RELS_NAMESPACE,
                        relationship_xml(&media.rel_target())
                    )
                    .into_bytes(),
                ),
            }),
        }
    }

    let content_types = entries
        .iter_mut()
        .find(|e| e.name == CONTENT_TYPES_ENTRY)
        .ok_or_else(|| RenderError::InvalidTemplate(format!("missing {}", CONTENT_TYPES_ENTRY)))?;
    let xml = entry_text(content_types)?;
    let updated = add_default_content_type(&xml, media.format)?;
    content_types.data = Some(updated.into_bytes());

    let media_name = media.entry_name();
    entries.retain(|e| e.name != media_name);
    entries.push(ArchiveEntry {
        name: media_name,
        options,
        data: Some(media.bytes.to_vec()),
    });

    Ok(())
}

fn entry_text(entry: &ArchiveEntry) -> Result<String, RenderError> {
    let data = entry.data.clone().unwrap_or_default();
    String::from_utf8(data).map_err(|e| RenderError::Entry {
        entry: entry.name.clone(),
        reason: e.to_string(),
    })
}

fn relationship_xml(target: &str) -> String {
    format!(
        r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
        PHOTO_REL_ID, IMAGE_REL_TYPE, target
    )
}

fn add_relationship(entry: &str, xml: &str, target: &str) -> Result<String, RenderError> {
    if xml.contains(&format!(r#"Id="{}""#, PHOTO_REL_ID)) {
        return Ok(xml.to_string());
    }
    let close = xml.rfind("</Relationships>").ok_or_else(|| RenderError::Entry {
        entry: entry.to_string(),
        reason: "no closing </Relationships> tag".to_string(),
    })?;
    Ok(format!("{}{}{}", &xml[..close], relationship_xml(target), &xml[close..]))
}

fn add_default_content_type(xml: &str, format: ImageFormat) -> Result<String, RenderError> {
    let needle = format!(r#"extension="{}""#, format.extension());
    if xml.to_lowercase().contains(&needle) {
        return Ok(xml.to_string());
    }
    let close = xml.rfind("</Types>").ok_or_else(|| RenderError::Entry {
        entry: CONTENT_TYPES_ENTRY.to_string(),
        reason: "no closing </Types> tag".to_string(),
    })?;
    Ok(format!(
        r#"{}<Default Extension="{}" ContentType="{}"/>{}"#,
        &xml[..close],
        format.extension(),
        format.content_type(),
        &xml[close..]
    ))
}

fn read_entries(template: &[u8]) -> Result<Vec<ArchiveEntry>, RenderError> {
    let mut archive =
        ZipArchive::new(Cursor::new(template)).map_err(|e| RenderError::InvalidTemplate(e.to_string()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        let options = FileOptions::default().compression_method(file.compression());
        if file.is_dir() {
            entries.push(ArchiveEntry {
                name,
                options,
                data: None,
            });
            continue;
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| RenderError::Entry {
            entry: name.clone(),
            reason: e.to_string(),
        })?;
        entries.push(ArchiveEntry {
            name,
            options,
            data: Some(data),
        });
    }
    Ok(entries)
}

fn write_entries(entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, RenderError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        match entry.data {
            None => writer.add_directory(entry.name, entry.options)?,
            Some(data) => {
                writer.start_file(entry.name, entry.options)?;
                writer.write_all(&data)?;
            }
        }
    }
    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;
    const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#;

    /// Minimal slide: a split-run name placeholder, a multi-line about slot and a photo shape.
    pub(crate) fn slide_xml(name_paragraph: &str) -> String {
        format!(
            concat!(
                r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
                r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>"#,
                r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Name"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
                r#"<p:spPr/><p:txBody><a:bodyPr/>{name}"#,
                r#"<a:p><a:r><a:rPr lang="es-AR"/><a:t>{{{{about}}}}</a:t></a:r></a:p>"#,
                r#"<a:p><a:r><a:t>Static text</a:t></a:r></a:p></p:txBody></p:sp>"#,
                r#"<p:sp><p:nvSpPr><p:cNvPr id="7" name="Photo"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
                r#"<p:spPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="300" cy="400"/></a:xfrm></p:spPr>"#,
                r#"<p:txBody><a:bodyPr/><a:p><a:r><a:t>{{{{%photo}}}}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                r#"</p:spTree></p:cSld></p:sld>"#
            ),
            name = name_paragraph
        )
    }

    pub(crate) fn build_pptx(slide: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, body) in [
            (CONTENT_TYPES_ENTRY, CONTENT_TYPES),
            ("ppt/slides/slide1.xml", slide),
            ("ppt/slides/_rels/slide1.xml.rels", SLIDE_RELS),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_entry(archive: &[u8], name: &str) -> Option<Vec<u8>> {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = zip.by_name(name).ok()?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        Some(data)
    }

    fn read_text(archive: &[u8], name: &str) -> String {
        String::from_utf8(read_entry(archive, name).unwrap()).unwrap()
    }

    fn fields(pairs: &[(&str, &str)], photo: Option<Vec<u8>>) -> NormalizedFields {
        let text: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NormalizedFields::new(text, photo)
    }

    const SPLIT_NAME: &str =
        r#"<a:p><a:r><a:rPr b="1"/><a:t>{{na</a:t></a:r><a:r><a:t>me}}</a:t></a:r><a:endParaRPr/></a:p>"#;

    #[test]
    fn test_placeholders_split_across_runs() {
        let template = build_pptx(&slide_xml(SPLIT_NAME));
        let out = PptxRenderer::default()
            .render(&template, &fields(&[("name", "Ana & Co <dev>"), ("about", "")], None))
            .unwrap();

        let slide = read_text(&out, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<a:r><a:rPr b="1"/><a:t>Ana &amp; Co &lt;dev&gt;</a:t></a:r><a:endParaRPr/>"#));
        assert!(!slide.contains("{{"));
        assert!(slide.contains("<a:t>Static text</a:t>"));
    }

    #[test]
    fn test_newlines_become_breaks() {
        let template = build_pptx(&slide_xml(SPLIT_NAME));
        let out = PptxRenderer::default()
            .render(&template, &fields(&[("about", "line one\nline two")], None))
            .unwrap();
        let slide = read_text(&out, "ppt/slides/slide1.xml");
        assert!(slide.contains(concat!(
            r#"<a:t>line one</a:t></a:r><a:br><a:rPr lang="es-AR"/></a:br>"#,
            r#"<a:r><a:rPr lang="es-AR"/><a:t>line two</a:t>"#
        )));
    }

    #[test]
    fn test_template_breaks_between_runs_survive() {
        let two_lines =
            r#"<a:p><a:r><a:t>{{name}}</a:t></a:r><a:br/><a:r><a:t>{{title}}</a:t></a:r></a:p>"#;
        let template = build_pptx(&slide_xml(two_lines));
        let out = PptxRenderer::default()
            .render(&template, &fields(&[("name", "Ana"), ("title", "Dev")], None))
            .unwrap();

        let slide = read_text(&out, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<a:p><a:r><a:t>Ana</a:t></a:r><a:br/><a:r><a:t>Dev</a:t></a:r></a:p>"#));
        assert!(!slide.contains("AnaDev"));
    }

    #[test]
    fn test_merged_text_maps_breaks_to_newlines() {
        assert_eq!(
            merged_text(r#"<a:r><a:t>a</a:t></a:r><a:br><a:rPr lang="es"/></a:br><a:r><a:t>b</a:t></a:r>"#),
            "a\nb"
        );
    }

    #[test]
    fn test_photo_slot_becomes_picture() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let template = build_pptx(&slide_xml(SPLIT_NAME));
        let out = PptxRenderer::default()
            .render(&template, &fields(&[("name", "Ana")], Some(png.clone())))
            .unwrap();

        let slide = read_text(&out, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<p:cNvPr id="7" name="Photo 7"/>"#));
        assert!(slide.contains(r#"<a:off x="100" y="200"/><a:ext cx="300" cy="400"/>"#));
        assert!(slide.contains(r#"r:embed="rIdCvPhoto""#));
        assert!(!slide.contains("%photo"));

        let rels = read_text(&out, "ppt/slides/_rels/slide1.xml.rels");
        assert!(rels.contains(r#"Target="../media/cvpress_photo.png""#));
        assert!(rels.contains("rId1"));

        let types = read_text(&out, CONTENT_TYPES_ENTRY);
        assert!(types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert_eq!(read_entry(&out, "ppt/media/cvpress_photo.png").unwrap(), png);
    }

    #[test]
    fn test_missing_photo_keeps_shape_and_clears_marker() {
        let template = build_pptx(&slide_xml(SPLIT_NAME));
        let out = PptxRenderer::default().render(&template, &fields(&[], None)).unwrap();

        let slide = read_text(&out, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<p:cNvPr id="7" name="Photo"/>"#));
        assert!(!slide.contains("%photo"));
        assert!(!slide.contains("<p:pic>"));
        assert!(read_entry(&out, "ppt/media/cvpress_photo.png").is_none());
    }

    #[test]
    fn test_unclosed_tag_reports_entry_and_fragment() {
        let broken = r#"<a:p><a:r><a:t>Hello {{name</a:t></a:r></a:p>"#;
        let template = build_pptx(&slide_xml(broken));
        match PptxRenderer::default().render(&template, &fields(&[], None)) {
            Err(RenderError::UnclosedTag { entry, fragment }) => {
                assert_eq!(entry, "ppt/slides/slide1.xml");
                assert_eq!(fragment, "{{name");
            }
            other => panic!("expected UnclosedTag, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            PptxRenderer::default().render(b"plain text", &fields(&[], None)),
            Err(RenderError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_find_unclosed() {
        assert_eq!(find_unclosed("{{a}} and {{b}}"), None);
        assert_eq!(find_unclosed("no markers"), None);
        assert_eq!(find_unclosed("{{a}} {{b"), Some(6));
        assert_eq!(find_unclosed("{{a {{b}}"), Some(0));
    }
}
