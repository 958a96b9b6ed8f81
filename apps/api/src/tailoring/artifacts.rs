//! Published compiled resumes.
//!
//! Only the terminal attempt of a run is published, as `<stem>.pdf` in the
//! configured directory, overwriting the previous PDF of the same resume.
//! Writes go to a temporary file that is renamed into place so a concurrent
//! download never sees a half-written PDF.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::tailoring::ArtifactRef;
use crate::store::upload::secure_filename;

/// Route under which published PDFs are served.
pub const COMPILED_ROUTE: &str = "/compiled";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Publishes `pdf` as `<stem>.pdf` and returns where it can be downloaded.
    pub async fn publish(&self, stem: &str, pdf: &Bytes) -> Result<ArtifactRef, ArtifactError> {
        let stem = secure_filename(stem);
        let file_name = if stem.is_empty() {
            "resume.pdf".to_string()
        } else {
            format!("{stem}.pdf")
        };

        self.ensure_dir().await?;
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, pdf).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.dir.join(&file_name)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(file = %file_name, bytes = pdf.len(), "published compiled resume");
        Ok(ArtifactRef {
            url: format!("{COMPILED_ROUTE}/{file_name}"),
            file_name,
        })
    }

    /// Reads a published PDF. Names must be bare `*.pdf` file names.
    pub async fn read(&self, file_name: &str) -> Result<Bytes, ArtifactError> {
        if !is_valid_name(file_name) {
            return Err(ArtifactError::InvalidName(file_name.to_string()));
        }
        match tokio::fs::read(self.dir.join(file_name)).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn is_valid_name(file_name: &str) -> bool {
    file_name.len() > ".pdf".len()
        && file_name.ends_with(".pdf")
        && secure_filename(file_name) == file_name
}
