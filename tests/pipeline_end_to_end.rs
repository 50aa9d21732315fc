use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cv_generator::converter::FormatConverter;
use cv_generator::template_system::TemplateCatalog;
use cv_generator::{
    normalize, ConvertError, CvGenerator, FetchConfig, ImageFetcher, PhotoOutcome, PipelineConfig,
    PptxRenderer, ProfileSet, SubmissionShape,
};
use serde_json::json;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;
const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

const SLIDE: &str = concat!(
    r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>"#,
    r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Body"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/>"#,
    r#"<a:p><a:r><a:rPr b="1"/><a:t>{{na</a:t></a:r><a:r><a:t>me}}</a:t></a:r></a:p>"#,
    r#"<a:p><a:r><a:t>{{exp_1_company}} / {{exp_1_role}}</a:t></a:r></a:p>"#,
    r#"<a:p><a:r><a:t>{{skill_1}} {{skill_2}} {{skill_3}}</a:t></a:r></a:p>"#,
    r#"</p:txBody></p:sp>"#,
    r#"<p:sp><p:nvSpPr><p:cNvPr id="5" name="Photo"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
    r#"<p:spPr><a:xfrm><a:off x="10" y="20"/><a:ext cx="30" cy="40"/></a:xfrm></p:spPr>"#,
    r#"<p:txBody><a:bodyPr/><a:p><a:r><a:t>{{%photo}}</a:t></a:r></a:p></p:txBody></p:sp>"#,
    r#"</p:spTree></p:cSld></p:sld>"#
);

/// Hands back the rendered document unchanged so the output can be inspected.
struct PassthroughConverter;

#[async_trait]
impl FormatConverter for PassthroughConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let output = out_dir.join("converted.pdf");
        tokio::fs::copy(input, &output).await?;
        Ok(output)
    }
}

fn template_bytes() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("ppt/slides/slide1.xml", SLIDE),
        ("ppt/slides/_rels/slide1.xml.rels", SLIDE_RELS),
    ] {
        writer.start_file(name, FileOptions::default()).unwrap();
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

fn generator(dir: &TempDir) -> CvGenerator {
    std::fs::write(dir.path().join("green.pptx"), template_bytes()).unwrap();
    std::fs::write(
        dir.path().join("catalog.toml"),
        "[[template]]\nid = 7\nfile = \"green.pptx\"\ndescription = \"Test layout\"\n",
    )
    .unwrap();

    CvGenerator::new(
        TemplateCatalog::load(dir.path()).unwrap(),
        ProfileSet::default(),
        ImageFetcher::new(&FetchConfig::default()).unwrap(),
        Arc::new(PptxRenderer::default()),
        Arc::new(PassthroughConverter),
    )
}

#[tokio::test]
async fn enveloped_submission_renders_every_slot() {
    let dir = TempDir::new().unwrap();
    let submission = json!({
        "fields": {
            "template_id": "7",
            "Nombre completo": "Ana Ruiz",
            "experience": [{"empresa": "Acme", "puesto": "Backend dev"}],
            "skills_raw": "Rust, SQL",
            "photo_base64": format!("data:image/png;base64,{}", STANDARD.encode(PNG)),
        }
    });

    let doc = generator(&dir).generate(&submission).await.unwrap();
    assert_eq!(doc.template_id, 7);
    assert!(doc.filename.starts_with("Ana_Ruiz_CV_"));
    assert!(matches!(doc.photo, PhotoOutcome::Inline));

    let slide = String::from_utf8(read_entry(&doc.pdf, "ppt/slides/slide1.xml").unwrap()).unwrap();
    assert!(slide.contains("Ana Ruiz"));
    assert!(slide.contains("Acme / Backend dev"));
    assert!(slide.contains("Rust SQL"));
    assert!(!slide.contains("{{"));
    assert!(slide.contains("<p:pic>"));
    assert_eq!(read_entry(&doc.pdf, "ppt/media/cvpress_photo.png").unwrap(), PNG);
}

#[tokio::test]
async fn missing_photo_leaves_shape_untouched() {
    let dir = TempDir::new().unwrap();
    let doc = generator(&dir)
        .generate(&json!({"template": 7, "name": ""}))
        .await
        .unwrap();

    assert_eq!(doc.filename, "cv.pdf");
    assert!(matches!(doc.photo, PhotoOutcome::Absent));
    let slide = String::from_utf8(read_entry(&doc.pdf, "ppt/slides/slide1.xml").unwrap()).unwrap();
    assert!(!slide.contains("<p:pic>"));
    assert!(!slide.contains("{{"));
}

#[tokio::test]
async fn normalize_fills_schema_for_flat_body() {
    let config = PipelineConfig::default();
    let fetcher = ImageFetcher::new(&FetchConfig::default()).unwrap();
    let output = normalize(
        &json!({"name": "Ana", "languages": ["Spanish", "English"]}),
        &config,
        &fetcher,
    )
    .await;

    assert_eq!(output.shape, SubmissionShape::Flat);
    assert_eq!(output.fields.get("language_1"), "Spanish");
    assert_eq!(output.fields.get("language_3"), "");
    for key in config.schema_keys() {
        assert!(output.fields.contains_key(&key), "missing {}", key);
    }
}
