//! Static glyph-width tables used to estimate how resume text wraps on a page.
//!
//! Widths are in em units at the configured font size and cover printable ASCII
//! (0x20..=0x7E, index = `c as usize - 32`). The numbers are approximations:
//! good enough to tell a half-empty page from an overflowing one, not to predict
//! TeX's line breaks exactly. When pdflatex is available the compiled page
//! measurement wins over anything computed here.

use serde::{Deserialize, Serialize};

/// Body font of the resume. LaTeX documents default to Computer Modern; a
/// preamble that switches `\familydefault` to `\sfdefault` is measured as sans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    ComputerModern,
    Sans,
}

impl FontFamily {
    /// Picks the body font declared by a LaTeX source.
    pub fn detect(source: &str) -> Self {
        let preamble = source
            .find(r"\begin{document}")
            .map(|idx| &source[..idx])
            .unwrap_or(source);
        if preamble.contains(r"\sfdefault") {
            FontFamily::Sans
        } else {
            FontFamily::ComputerModern
        }
    }
}

/// Geometry of a one-page resume.
///
/// `text_width_em` is the usable line width in em units; `lines_per_page` is
/// how many body lines fit between the top and bottom margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    pub font: FontFamily,
    pub font_size_pt: u8,
    pub text_width_em: f32,
    pub lines_per_page: u16,
    /// Extra vertical space charged for every section heading, in lines.
    pub heading_spacing_lines: f32,
}

/// US letter, 11pt, 0.5" margins: 7.5" x (72.27pt/in / 11pt) ~ 49.3em wide and
/// 10" of text height at a 13.6pt baseline ~ 53 lines, minus list spacing.
pub fn resume_page_config(font: FontFamily) -> PageConfig {
    PageConfig {
        font,
        font_size_pt: 11,
        text_width_em: 49.3,
        lines_per_page: 50,
        heading_spacing_lines: 1.0,
    }
}

pub struct FontMetricTable {
    pub font: FontFamily,
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters.
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Number of printed lines `s` occupies under greedy word wrap at
    /// `config.text_width_em`. Whitespace-only input occupies zero lines.
    pub fn wrapped_lines(&self, s: &str, config: &PageConfig) -> u32 {
        let max_width = config.text_width_em;
        let mut lines = 0u32;
        let mut current_width = 0.0_f32;

        for word in s.split_whitespace() {
            let word_w = self.measure_str(word);
            if lines == 0 {
                lines = 1;
                current_width = word_w;
            } else if current_width + self.space_width + word_w > max_width {
                lines += 1;
                current_width = word_w;
            } else {
                current_width += self.space_width + word_w;
            }
        }
        lines
    }
}

/// Sans-serif body text (Helvetica / Latin Modern Sans proportions).
static SANS_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Sans,
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.25, 0.30, 0.38, 0.56, 0.56, 0.89, 0.67, 0.22, 0.33, 0.33, 0.39, 0.59, 0.28, 0.33, 0.28, 0.31,
        // 0     1     2     3     4     5     6     7     8     9
        0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.59, 0.59, 0.59, 0.50, 1.02,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.67, 0.61, 0.61, 0.67, 0.56, 0.50, 0.67, 0.67, 0.25, 0.39, 0.61, 0.53, 0.78,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.67, 0.72, 0.56, 0.72, 0.61, 0.50, 0.56, 0.67, 0.67, 0.89, 0.61, 0.61, 0.56,
        // [     \     ]     ^     _     `
        0.28, 0.31, 0.28, 0.47, 0.56, 0.34,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.56, 0.56, 0.50, 0.56, 0.56, 0.31, 0.56, 0.56, 0.22, 0.22, 0.53, 0.22, 0.83,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.56, 0.56, 0.56, 0.56, 0.33, 0.44, 0.39, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
        // {     |     }     ~
        0.33, 0.26, 0.33, 0.59,
    ],
    average_char_width: 0.52,
    space_width: 0.25,
};

/// Computer Modern, the TeX default.
static COMPUTER_MODERN_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::ComputerModern,
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.23, 0.27, 0.34, 0.50, 0.50, 0.80, 0.60, 0.20, 0.30, 0.30, 0.35, 0.53, 0.25, 0.30, 0.25, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50,
        // :     ;     <     =     >     ?     @
        0.25, 0.25, 0.53, 0.53, 0.53, 0.45, 0.92,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.60, 0.55, 0.55, 0.60, 0.50, 0.45, 0.60, 0.60, 0.23, 0.35, 0.55, 0.48, 0.70,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.60, 0.65, 0.50, 0.65, 0.55, 0.45, 0.50, 0.60, 0.60, 0.80, 0.55, 0.55, 0.50,
        // [     \     ]     ^     _     `
        0.25, 0.28, 0.25, 0.42, 0.50, 0.31,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.50, 0.50, 0.45, 0.50, 0.50, 0.28, 0.50, 0.50, 0.20, 0.20, 0.48, 0.20, 0.75,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.50, 0.50, 0.50, 0.50, 0.30, 0.40, 0.35, 0.50, 0.45, 0.65, 0.45, 0.45, 0.40,
        // {     |     }     ~
        0.30, 0.23, 0.30, 0.53,
    ],
    average_char_width: 0.47,
    space_width: 0.23,
};

/// Returns the static metric table for a given font family.
pub fn get_metrics(font: &FontFamily) -> &'static FontMetricTable {
    match font {
        FontFamily::ComputerModern => &COMPUTER_MODERN_TABLE,
        FontFamily::Sans => &SANS_TABLE,
    }
}
