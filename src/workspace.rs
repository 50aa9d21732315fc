// src/workspace.rs
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

use crate::app_log;
use crate::converter::FormatConverter;
use crate::error::GenerateError;

/// Per-request scratch directory; removed when dropped.
pub struct WorkspaceManager {
    dir: TempDir,
}

impl WorkspaceManager {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("cvpress-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the rendered document under a unique name and return its path.
    pub async fn write_document(&self, bytes: &[u8], extension: &str) -> std::io::Result<PathBuf> {
        let path = self
            .dir
            .path()
            .join(format!("cv-{}.{}", Uuid::new_v4(), extension));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Convert a rendered document and read the PDF back.
    pub async fn convert(
        &self,
        document: &[u8],
        extension: &str,
        converter: &dyn FormatConverter,
    ) -> Result<Vec<u8>, GenerateError> {
        let input = self.write_document(document, extension).await?;
        let output = converter.convert(&input, self.dir.path()).await?;
        let pdf = tokio::fs::read(&output).await?;

        app_log!(
            debug,
            "Converted {} -> {} ({} bytes)",
            input.display(),
            output.display(),
            pdf.len()
        );
        Ok(pdf)
    }
}
