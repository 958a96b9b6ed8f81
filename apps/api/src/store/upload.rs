//! Turns an uploaded file into resume source text.

use std::path::Path;

use thiserror::Error;

use crate::models::resume::SourceFormat;

/// Text extracted from an upload, ready to be loaded into the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedResume {
    pub source_text: String,
    pub source_format: SourceFormat,
    pub filename: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file selected")]
    MissingFilename,

    #[error("Only LaTeX (.tex), plain text (.txt) and PDF (.pdf) resumes are supported")]
    UnsupportedType,

    #[error("The uploaded file is empty")]
    Empty,

    #[error("The uploaded file is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("Could not extract text from PDF: {0}")]
    Pdf(String),
}

/// Reduces a client-supplied file name to a safe, flat name: path components
/// are dropped, whitespace becomes `_`, and only `[A-Za-z0-9._-]` is kept.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Extracts resume text from an uploaded file. PDF parsing is CPU-bound and
/// runs on the blocking pool.
pub async fn extract_resume(filename: &str, bytes: Vec<u8>) -> Result<ExtractedResume, UploadError> {
    let filename = secure_filename(filename);
    if filename.is_empty() {
        return Err(UploadError::MissingFilename);
    }
    let extension = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(UploadError::UnsupportedType)?;

    let (source_text, source_format) = match extension.as_str() {
        "tex" => (decode_text(bytes)?, SourceFormat::Latex),
        "txt" => (decode_text(bytes)?, SourceFormat::PlainText),
        "pdf" => {
            let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| UploadError::Pdf(e.to_string()))?
                .map_err(|e| UploadError::Pdf(e.to_string()))?;
            (text, SourceFormat::PlainText)
        }
        _ => return Err(UploadError::UnsupportedType),
    };

    if source_text.trim().is_empty() {
        return Err(UploadError::Empty);
    }

    Ok(ExtractedResume {
        source_text,
        source_format,
        filename,
    })
}

fn decode_text(bytes: Vec<u8>) -> Result<String, UploadError> {
    let text = String::from_utf8(bytes).map_err(|_| UploadError::InvalidEncoding)?;
    // Editors on Windows like to prepend a byte-order mark.
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Resume.tex"), "My_Resume.tex");
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\jane\\cv (final).tex"), "cv_final.tex");
        assert_eq!(secure_filename(".hidden.tex"), "hidden.tex");
        assert_eq!(secure_filename("résumé.tex"), "rsum.tex");
        assert_eq!(secure_filename("../"), "");
    }

    #[tokio::test]
    async fn test_extract_latex_upload() {
        let doc = "\\documentclass{article}\\begin{document}Hi\\end{document}";
        let extracted = extract_resume("jane cv.tex", doc.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(extracted.source_format, SourceFormat::Latex);
        assert_eq!(extracted.filename, "jane_cv.tex");
        assert_eq!(extracted.source_text, doc);
    }

    #[tokio::test]
    async fn test_extract_plain_text_strips_bom() {
        let extracted = extract_resume("CV.TXT", "\u{feff}Jane Doe".as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(extracted.source_format, SourceFormat::PlainText);
        assert_eq!(extracted.source_text, "Jane Doe");
    }

    #[tokio::test]
    async fn test_rejected_uploads() {
        assert!(matches!(
            extract_resume("cv.docx", b"PK".to_vec()).await,
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            extract_resume("README", b"text".to_vec()).await,
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            extract_resume("", b"text".to_vec()).await,
            Err(UploadError::MissingFilename)
        ));
        assert!(matches!(
            extract_resume("cv.tex", b"  \n".to_vec()).await,
            Err(UploadError::Empty)
        ));
        assert!(matches!(
            extract_resume("cv.tex", vec![0xff, 0xfe, 0x00]).await,
            Err(UploadError::InvalidEncoding)
        ));
        assert!(matches!(
            extract_resume("cv.pdf", b"not a pdf".to_vec()).await,
            Err(UploadError::Pdf(_))
        ));
    }
}
