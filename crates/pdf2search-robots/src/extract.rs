//! The PDF byte-to-text collaborator.
//!
//! Extraction is opaque to the pipeline; anything that turns a path
//! into text can sit behind [`Extractor`]. The shipped implementation
//! shells out to poppler's `pdftotext`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed for {path} ({status}): {stderr}")]
    Failed {
        command: String,
        path: String,
        status: String,
        stderr: String,
    },

    #[error("extracted text from {path} is not valid UTF-8")]
    Encoding { path: String },
}

/// Opaque text extraction; may fail on any malformed input.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// `pdftotext <path> -` with UTF-8 output.
pub struct PdftotextExtractor {
    binary: String,
}

impl PdftotextExtractor {
    pub fn new() -> Self {
        Self {
            binary: "pdftotext".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PdftotextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ExtractionError::Spawn {
                command: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Failed {
                command: self.binary.clone(),
                path: path.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ExtractionError::Encoding {
            path: path.display().to_string(),
        })
    }
}
