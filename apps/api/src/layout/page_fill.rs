//! Page-fit estimation: how full is the (last) page, and how many pages are there?
//!
//! Two sources of truth, in order of preference:
//! - a compiled PDF, whose page count comes from pdfTeX and whose last-page
//!   fill is the measured content height over the page goal;
//! - the generated source text, wrapped against static font metrics and divided
//!   by the number of lines one page holds.
//!
//! Estimation never fails. Empty or unmeasurable input yields `page_count = 1`
//! and `fill_ratio = None`, and the caller decides what that means.

use serde::{Deserialize, Serialize};

use crate::compiler::CompiledPdf;
use crate::layout::font_metrics::{get_metrics, resume_page_config, FontFamily, PageConfig};
use crate::layout::text_layout::{count_printed_lines, visible_lines};
use crate::models::resume::SourceFormat;

/// Where a fit estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    Compiled,
    TextHeuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageFit {
    /// Always >= 1.
    pub page_count: u32,
    /// Share of the last page's usable height that holds content, if known.
    pub fill_ratio: Option<f32>,
    pub method: FitMethod,
}

impl PageFit {
    fn indeterminate(method: FitMethod) -> Self {
        Self {
            page_count: 1,
            fill_ratio: None,
            method,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageFitEstimator {
    page: PageConfig,
}

impl Default for PageFitEstimator {
    fn default() -> Self {
        Self::new(resume_page_config(FontFamily::ComputerModern))
    }
}

impl PageFitEstimator {
    pub fn new(page: PageConfig) -> Self {
        Self { page }
    }

    /// Reads the fit from a compiled artifact. Returns `None` when pdfTeX did
    /// not report a page count, so the caller can fall back to the text.
    pub fn from_artifact(&self, pdf: &CompiledPdf) -> Option<PageFit> {
        let page_count = pdf.page_count.filter(|&n| n > 0)?;
        let fill_ratio = pdf
            .last_page
            .and_then(|measure| measure.fill_ratio())
            .map(|ratio| ratio.max(0.0));
        Some(PageFit {
            page_count,
            fill_ratio,
            method: FitMethod::Compiled,
        })
    }

    /// Heuristic fit from the source text alone.
    pub fn from_text(&self, source: &str, format: SourceFormat) -> PageFit {
        let lines = visible_lines(source, format);
        if lines.iter().all(|line| line.text.is_empty()) {
            return PageFit::indeterminate(FitMethod::TextHeuristic);
        }

        let mut page = self.page.clone();
        if format == SourceFormat::Latex {
            page.font = FontFamily::detect(source);
        }
        let metrics = get_metrics(&page.font);
        let total_lines = count_printed_lines(&lines, metrics, &page);

        fit_from_line_count(total_lines, page.lines_per_page as f32)
    }
}

/// Splits a printed line count into pages and the last page's fill.
fn fit_from_line_count(total_lines: f32, capacity: f32) -> PageFit {
    if total_lines <= 0.0 || capacity <= 0.0 {
        return PageFit::indeterminate(FitMethod::TextHeuristic);
    }
    let page_count = (total_lines / capacity).ceil().max(1.0) as u32;
    let last_page_lines = total_lines - (page_count - 1) as f32 * capacity;
    PageFit {
        page_count,
        fill_ratio: Some(last_page_lines / capacity),
        method: FitMethod::TextHeuristic,
    }
}
