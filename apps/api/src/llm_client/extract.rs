//! Post-processing of raw model output.
//!
//! Models wrap documents in markdown fences or add prose around them even when
//! told not to. These helpers recover the document itself.

use tracing::warn;

use crate::llm_client::LlmError;

const DOCUMENTCLASS: &str = r"\documentclass";
const BEGIN_DOCUMENT: &str = r"\begin{document}";
const END_DOCUMENT: &str = r"\end{document}";

/// Recovers a LaTeX document from a model response.
///
/// `original_source` is the resume the user uploaded; its preamble is reused
/// when the model returns only the document body.
pub fn extract_latex(response: &str, original_source: &str) -> Result<String, LlmError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyContent);
    }

    let candidate = fenced_blocks(trimmed)
        .into_iter()
        .find(|block| has_document_marker(block))
        .unwrap_or(trimmed);

    let mut text = if let Some(start) = candidate.find(DOCUMENTCLASS) {
        candidate[start..].to_string()
    } else if let Some(start) = candidate.find(BEGIN_DOCUMENT) {
        warn!("model output is missing the preamble, reusing the uploaded one");
        format!("{}{}", preamble(original_source), &candidate[start..])
    } else {
        let preview: String = trimmed.chars().take(200).collect();
        return Err(LlmError::MalformedOutput(format!(
            "no LaTeX document found in response starting with: {preview}"
        )));
    };

    if let Some(end) = text.find(END_DOCUMENT) {
        text.truncate(end + END_DOCUMENT.len());
    }
    Ok(text)
}

/// Removes a single surrounding markdown fence from plain-text output.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```text, ```markdown) on the opening line.
    let inner = match inner.find('\n') {
        Some(nl) => &inner[nl + 1..],
        None => inner,
    };
    inner.trim_end().strip_suffix("```").unwrap_or(inner).trim()
}

/// Everything before `\begin{document}`, or nothing when the marker is absent.
fn preamble(source: &str) -> &str {
    source
        .find(BEGIN_DOCUMENT)
        .map(|idx| &source[..idx])
        .unwrap_or("")
}

fn has_document_marker(text: &str) -> bool {
    text.contains(DOCUMENTCLASS) || text.contains(BEGIN_DOCUMENT)
}

/// Contents of every closed ``` fence, info strings removed.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let Some(close) = after.find("```") else {
            break;
        };
        let block = &after[..close];
        let body = match block.find('\n') {
            Some(nl) if !block[..nl].contains('\\') => &block[nl + 1..],
            _ => block,
        };
        blocks.push(body.trim());
        rest = &after[close + 3..];
    }
    blocks
}
