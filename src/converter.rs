// src/converter.rs
//! Document-to-PDF conversion through a headless office install.

use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::app_log;
use crate::error::ConvertError;

#[async_trait]
pub trait FormatConverter: Send + Sync {
    /// Convert `input` into `out_dir` and return the produced file.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;
}

#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: PathBuf,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn user_installation(profile_dir: &Path) -> String {
        Url::from_directory_path(profile_dir)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", profile_dir.display()))
    }
}

#[async_trait]
impl FormatConverter for SofficeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        // A private profile per call, so parallel conversions never share a lock
        let profile = tempfile::Builder::new().prefix("cvpress-lo-").tempdir()?;

        let mut command = Command::new(&self.binary);
        command
            .arg(format!(
                "-env:UserInstallation={}",
                Self::user_installation(profile.path())
            ))
            .args([
                "--headless",
                "--nologo",
                "--nofirststartwizard",
                "--norestore",
                "--convert-to",
                "pdf",
                "--outdir",
            ])
            .arg(out_dir)
            .arg(input)
            .kill_on_drop(true);

        app_log!(debug, "Running {} on {}", self.binary.display(), input.display());

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ConvertError::Timeout {
                binary: self.binary.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|source| ConvertError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                binary: self.binary.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            });
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let produced = out_dir.join(format!("{}.pdf", stem));

        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            return Err(ConvertError::MissingOutput { path: produced });
        }

        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn converter(binary: &str) -> SofficeConverter {
        SofficeConverter::new(binary, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let result = converter("/nonexistent/soffice")
            .convert(&dir.path().join("cv.pptx"), dir.path())
            .await;
        assert!(matches!(result, Err(ConvertError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_binary_reports_failure() {
        let dir = TempDir::new().unwrap();
        let result = converter("false")
            .convert(&dir.path().join("cv.pptx"), dir.path())
            .await;
        match result {
            Err(ConvertError::Failed { binary, .. }) => assert_eq!(binary, PathBuf::from("false")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_output_is_missing_output() {
        let dir = TempDir::new().unwrap();
        let result = converter("true")
            .convert(&dir.path().join("cv-1.pptx"), dir.path())
            .await;
        match result {
            Err(ConvertError::MissingOutput { path }) => assert!(path.ends_with("cv-1.pdf")),
            other => panic!("expected MissingOutput, got {other:?}"),
        }
    }

    #[test]
    fn test_user_installation_is_file_url() {
        let dir = TempDir::new().unwrap();
        assert!(SofficeConverter::user_installation(dir.path()).starts_with("file://"));
    }
}
