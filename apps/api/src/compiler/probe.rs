//! Page measurement probe and pdfTeX log parsing.
//!
//! The probe asks TeX itself how much of the last page is used: right before
//! `\end{document}` it flushes the current paragraph and writes
//! `\pagetotal` (accumulated height on the current page) and `\pagegoal`
//! (usable height) to the log.

use serde::{Deserialize, Serialize};

pub const PROBE_MARKER: &str = "TAILOR-PAGE-FILL";

/// `\pagegoal` equals `\maxdimen` when the current page is still empty.
const MAX_DIMEN_PT: f32 = 16383.0;

/// Content height and usable height of the last page, in TeX points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMeasure {
    pub used_pt: f32,
    pub goal_pt: f32,
}

impl PageMeasure {
    /// Share of the last page in use. An empty current page at
    /// `\end{document}` means the previous page was shipped out full, so the
    /// last printed page counts as 1.0.
    pub fn fill_ratio(&self) -> Option<f32> {
        if self.goal_pt >= MAX_DIMEN_PT {
            return Some(1.0);
        }
        if self.goal_pt <= 0.0 {
            return None;
        }
        Some(self.used_pt / self.goal_pt)
    }
}

/// Inserts the probe before the last `\end{document}`. Sources without one are
/// returned unchanged.
pub fn inject_probe(source: &str) -> String {
    match source.rfind(r"\end{document}") {
        Some(idx) => format!(
            "{}\n\\par\\typeout{{{PROBE_MARKER}:\\the\\pagetotal:\\the\\pagegoal}}\n{}",
            &source[..idx],
            &source[idx..]
        ),
        None => source.to_string(),
    }
}

/// Parses the probe line written by [`inject_probe`].
pub fn parse_probe(log: &str) -> Option<PageMeasure> {
    let line = log.lines().rev().find(|l| l.contains(PROBE_MARKER))?;
    let rest = &line[line.find(PROBE_MARKER)? + PROBE_MARKER.len()..];
    let mut parts = rest.trim_start_matches(':').split(':');
    let used_pt = parse_points(parts.next()?)?;
    let goal_pt = parse_points(parts.next()?)?;
    Some(PageMeasure { used_pt, goal_pt })
}

/// Reads N from pdfTeX's `Output written on resume.pdf (N pages, M bytes).`
pub fn parse_page_count(log: &str) -> Option<u32> {
    let line = log.lines().find(|l| l.contains("Output written on"))?;
    let open = line.rfind('(')?;
    let digits: String = line[open + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// First TeX error line (`! ...`) of a log, used as a short failure summary.
pub fn first_error(log: &str) -> Option<&str> {
    log.lines().find(|l| l.starts_with("! ")).map(str::trim)
}

fn parse_points(value: &str) -> Option<f32> {
    value.trim().trim_end_matches("pt").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "This is pdfTeX, Version 3.141592653\n\
        (./resume.tex\n\
        LaTeX2e <2023-11-01>\n\
        TAILOR-PAGE-FILL:598.0pt:650.43pt\n\
        [1{/usr/share/texlive/texmf-dist/fonts/map/pdftex/updmap/pdftex.map}] )\n\
        Output written on resume.pdf (1 page, 45123 bytes).\n\
        Transcript written on resume.log.\n";

    #[test]
    fn test_inject_probe_before_last_end_document() {
        let source = "\\begin{document}\nHello\n\\end{document}\n";
        let probed = inject_probe(source);
        let probe_at = probed.find(PROBE_MARKER).unwrap();
        let end_at = probed.rfind("\\end{document}").unwrap();
        assert!(probe_at < end_at);
        assert!(probed.contains("\\typeout{TAILOR-PAGE-FILL:\\the\\pagetotal:\\the\\pagegoal}"));
        assert!(probed.starts_with("\\begin{document}\nHello\n"));
    }

    #[test]
    fn test_inject_probe_without_end_document_is_noop() {
        assert_eq!(inject_probe("plain text"), "plain text");
    }

    #[test]
    fn test_parse_probe_and_page_count() {
        let measure = parse_probe(LOG).unwrap();
        assert!((measure.used_pt - 598.0).abs() < 1e-3);
        assert!((measure.goal_pt - 650.43).abs() < 1e-3);
        assert_eq!(parse_page_count(LOG), Some(1));
    }

    #[test]
    fn test_parse_page_count_plural() {
        let log = "Output written on resume.pdf (2 pages, 80211 bytes).";
        assert_eq!(parse_page_count(log), Some(2));
        assert_eq!(parse_page_count("No pages of output."), None);
    }

    #[test]
    fn test_empty_current_page_means_previous_page_is_full() {
        let log = "TAILOR-PAGE-FILL:0.0pt:16383.99998pt\n\
                   Output written on resume.pdf (1 page, 40211 bytes).\n";
        let measure = parse_probe(log).unwrap();
        assert_eq!(measure.fill_ratio(), Some(1.0));
    }

    #[test]
    fn test_zero_page_goal_is_indeterminate() {
        let measure = PageMeasure {
            used_pt: 10.0,
            goal_pt: 0.0,
        };
        assert_eq!(measure.fill_ratio(), None);
    }

    #[test]
    fn test_first_error_line() {
        let log = "(./resume.tex\n! Undefined control sequence.\nl.12 \\resumeItm\n";
        assert_eq!(first_error(log), Some("! Undefined control sequence."));
        assert_eq!(first_error(LOG), None);
    }
}
