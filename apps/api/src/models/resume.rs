use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Number of characters shown in resume previews.
const PREVIEW_CHARS: usize = 500;

/// How the resume source is encoded. Only LaTeX sources are compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Latex,
    PlainText,
}

impl SourceFormat {
    /// Stable name used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Latex => "latex",
            SourceFormat::PlainText => "plain_text",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "latex" => Some(SourceFormat::Latex),
            "plain_text" => Some(SourceFormat::PlainText),
            _ => None,
        }
    }

    /// The `file_type` reported to the extension.
    pub fn file_type(&self) -> &'static str {
        match self {
            SourceFormat::Latex => "tex",
            SourceFormat::PlainText => "txt",
        }
    }

    pub fn supports_compilation(&self) -> bool {
        matches!(self, SourceFormat::Latex)
    }
}

/// The single resume currently loaded into the server.
///
/// Replaced wholesale on every upload. `persisted` flips to true only after the
/// durable save succeeded (or when the document was restored from storage).
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub source_text: String,
    pub source_format: SourceFormat,
    pub original_filename: String,
    pub persisted: bool,
    /// Upload time, or the durable save time for a restored document.
    pub loaded_at: DateTime<Utc>,
}

impl ResumeDocument {
    pub fn new(source_text: String, source_format: SourceFormat, original_filename: String) -> Self {
        Self {
            source_text,
            source_format,
            original_filename,
            persisted: false,
            loaded_at: Utc::now(),
        }
    }

    /// First 500 characters of the source, suffixed with "..." when truncated.
    pub fn preview(&self) -> String {
        preview_text(&self.source_text)
    }

    /// Filename without extension, used to name the published PDF.
    pub fn stem(&self) -> &str {
        Path::new(&self.original_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("resume")
    }
}

pub fn preview_text(text: &str) -> String {
    let mut chars = text.char_indices();
    match chars.nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Row of the single-row `saved_resume` table.
#[derive(Debug, Clone, FromRow)]
pub struct SavedResumeRow {
    pub source_text: String,
    pub source_format: String,
    pub original_filename: String,
    pub saved_at: DateTime<Utc>,
}
