// src/template_check.rs
//! Static placeholder checks for `.pptx` templates.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::RenderError;
use crate::template_processor::{find_unclosed, fragment_at, CLOSE_MARKER, OPEN_MARKER};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateIssue {
    /// A second `{{` opened while an earlier one was still open, counted across runs.
    DoubleOpen { run: usize, text: String },
    /// A paragraph whose placeholder never closes.
    Unclosed { paragraph: usize, fragment: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SlideReport {
    pub entry: String,
    pub text_runs: usize,
    /// Runs containing `{{` or `}}`, with their index.
    pub marker_runs: Vec<(usize, String)>,
    pub issues: Vec<TemplateIssue>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateReport {
    pub slides: Vec<SlideReport>,
}

impl TemplateReport {
    pub fn is_ok(&self) -> bool {
        self.slides.iter().all(|s| s.issues.is_empty())
    }

    pub fn issue_count(&self) -> usize {
        self.slides.iter().map(|s| s.issues.len()).sum()
    }
}

pub fn check_template(bytes: &[u8]) -> Result<TemplateReport, RenderError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| RenderError::InvalidTemplate(e.to_string()))?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    slide_names.sort_by_key(|name| slide_number(name));

    if slide_names.is_empty() {
        return Err(RenderError::InvalidTemplate("no slides found".to_string()));
    }

    let mut report = TemplateReport::default();
    for name in slide_names {
        let mut xml = Vec::new();
        archive
            .by_name(&name)?
            .read_to_end(&mut xml)
            .map_err(|e| RenderError::Entry {
                entry: name.clone(),
                reason: e.to_string(),
            })?;
        report.slides.push(check_slide(&name, &xml)?);
    }

    Ok(report)
}

fn slide_number(name: &str) -> u32 {
    name.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(u32::MAX)
}

/// Opening (`true`) and closing (`false`) markers in the order they appear.
fn marker_sequence(text: &str) -> Vec<bool> {
    let mut markers: Vec<(usize, bool)> = text
        .match_indices(OPEN_MARKER)
        .map(|(i, _)| (i, true))
        .chain(text.match_indices(CLOSE_MARKER).map(|(i, _)| (i, false)))
        .collect();
    markers.sort_by_key(|(i, _)| *i);
    markers.into_iter().map(|(_, is_open)| is_open).collect()
}

fn check_slide(entry: &str, xml: &[u8]) -> Result<SlideReport, RenderError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();

    let mut report = SlideReport {
        entry: entry.to_string(),
        ..SlideReport::default()
    };
    let mut in_text = false;
    let mut open_depth: usize = 0;
    let mut paragraph = String::new();
    let mut paragraph_index = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"a:t" => in_text = true,
                b"a:p" => paragraph.clear(),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" => {
                    if let Some(position) = find_unclosed(&paragraph) {
                        report.issues.push(TemplateIssue::Unclosed {
                            paragraph: paragraph_index,
                            fragment: fragment_at(&paragraph, position),
                        });
                    }
                    paragraph_index += 1;
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| RenderError::Entry {
                        entry: entry.to_string(),
                        reason: err.to_string(),
                    })?
                    .into_owned();

                let run = report.text_runs;
                report.text_runs += 1;
                paragraph.push_str(&text);

                let markers = marker_sequence(&text);
                if !markers.is_empty() {
                    report.marker_runs.push((run, text.clone()));
                }

                let mut double_open = false;
                for is_open in markers {
                    if is_open {
                        open_depth += 1;
                        if open_depth > 1 {
                            double_open = true;
                            open_depth = 1;
                        }
                    } else {
                        open_depth = open_depth.saturating_sub(1);
                    }
                }
                if double_open {
                    report.issues.push(TemplateIssue::DoubleOpen { run, text });
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(RenderError::Entry {
                    entry: entry.to_string(),
                    reason: format!("XML error at {}: {}", reader.buffer_position(), e),
                })
            }
        }
        buf.clear();
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_processor::tests::{build_pptx, slide_xml};

    #[test]
    fn test_clean_template() {
        let split = r#"<a:p><a:r><a:t>{{na</a:t></a:r><a:r><a:t>me}}</a:t></a:r></a:p>"#;
        let report = check_template(&build_pptx(&slide_xml(split))).unwrap();

        assert!(report.is_ok());
        let slide = &report.slides[0];
        assert_eq!(slide.entry, "ppt/slides/slide1.xml");
        assert_eq!(slide.text_runs, 5);
        assert_eq!(
            slide.marker_runs.iter().map(|(i, _)| *i).collect::<Vec<_>>(),
            vec![0, 1, 2, 4]
        );
    }

    #[test]
    fn test_double_open_and_unclosed() {
        let broken = r#"<a:p><a:r><a:t>{{name</a:t></a:r><a:r><a:t>{{title}}</a:t></a:r></a:p>"#;
        let report = check_template(&build_pptx(&slide_xml(broken))).unwrap();

        assert!(!report.is_ok());
        let issues = &report.slides[0].issues;
        assert!(issues.contains(&TemplateIssue::DoubleOpen {
            run: 1,
            text: "{{title}}".to_string()
        }));
        assert!(issues.contains(&TemplateIssue::Unclosed {
            paragraph: 0,
            fragment: "{{name{{title}}".to_string()
        }));
    }

    #[test]
    fn test_not_a_pptx() {
        assert!(matches!(
            check_template(b"nope"),
            Err(RenderError::InvalidTemplate(_))
        ));
    }
}
