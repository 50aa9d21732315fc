// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::app_log;
use crate::core::config_manager::AppConfig;
use crate::core::pipeline::normalize;
use crate::generator::CvGenerator;
use crate::image_acquisition::ImageFetcher;
use crate::template_check::{check_template, TemplateIssue};
use crate::types::NormalizationReport;
use crate::utils::validate_file_extension;
use crate::web::start_web_server;

#[derive(Parser)]
#[command(name = "cvpress")]
#[command(about = "Normalize CV form submissions and render them to PDF")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the normalized field map of a submission as JSON
    Normalize {
        input: PathBuf,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Run the full pipeline and write the PDF
    Generate {
        input: PathBuf,
        #[arg(long)]
        template: Option<String>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Report split or unclosed placeholders in a .pptx template
    CheckTemplate { file: PathBuf },
}

pub async fn handle_command(cli: Cli, mut config: AppConfig) -> Result<()> {
    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            start_web_server(config).await
        }

        Command::Normalize { input, profile } => {
            let submission = read_submission(&input).await?;
            let pipeline = config.profiles.get(profile.as_deref())?;
            let fetcher = ImageFetcher::new(&config.fetch)?;

            let output = normalize(&submission, &pipeline, &fetcher).await;
            let report = NormalizationReport::from_output(&output, &pipeline.photo.key);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Command::Generate {
            input,
            template,
            output,
        } => {
            let submission = read_submission(&input).await?;
            let generator = CvGenerator::from_config(&config)?;
            let document = generator
                .generate_with(&submission, template.as_deref())
                .await?;

            let path = output.unwrap_or_else(|| PathBuf::from(&document.filename));
            tokio::fs::write(&path, &document.pdf)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            app_log!(
                info,
                "✅ Wrote {} ({} bytes, template {}, photo: {})",
                path.display(),
                document.pdf.len(),
                document.template_id,
                document.photo.label()
            );
            Ok(())
        }

        Command::CheckTemplate { file } => {
            validate_file_extension(&file.to_string_lossy(), &["pptx"])?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let report = check_template(&bytes)?;

            for slide in &report.slides {
                println!(
                    "{}: {} text runs, {} with markers",
                    slide.entry,
                    slide.text_runs,
                    slide.marker_runs.len()
                );
                for issue in &slide.issues {
                    match issue {
                        TemplateIssue::DoubleOpen { run, text } => {
                            println!("  ❌ run {}: '{{{{' opened twice: {}", run, text)
                        }
                        TemplateIssue::Unclosed {
                            paragraph,
                            fragment,
                        } => println!("  ❌ paragraph {}: unclosed placeholder: {}", paragraph, fragment),
                    }
                }
            }

            if report.is_ok() {
                println!("✅ {} looks good", file.display());
                Ok(())
            } else {
                anyhow::bail!(
                    "{} placeholder issue(s) in {}",
                    report.issue_count(),
                    file.display()
                )
            }
        }
    }
}

async fn read_submission(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}
