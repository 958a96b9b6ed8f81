//! Visible-text reconstruction for the text-based page-fit heuristic.
//!
//! Turns a resume source into the lines a reader would see on paper. For LaTeX
//! this is deliberately shallow: the preamble and comments are dropped,
//! structural commands, environment boundaries and blank lines become line
//! breaks, a single source newline is a space, layout commands vanish together
//! with their arguments, and every other command keeps its argument text.

use crate::layout::font_metrics::{FontMetricTable, PageConfig};
use crate::models::resume::SourceFormat;

/// One printed line (before wrapping) of the reconstructed resume.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleLine {
    pub text: String,
    pub is_heading: bool,
}

/// Commands that start a new printed line.
const BREAK_COMMANDS: &[&str] = &[
    "item",
    "newline",
    "par",
    "linebreak",
    "resumeItem",
    "resumeSubheading",
    "resumeProjectHeading",
    "cventry",
];

/// Commands whose argument is a heading.
const HEADING_COMMANDS: &[&str] = &["section", "subsection", "subsubsection", "cvsection"];

/// Environment boundaries: they end the running paragraph and print nothing.
const ENVIRONMENT_COMMANDS: &[&str] = &["begin", "end"];

/// Commands that render nothing: all of their `{}` / `[]` arguments are skipped.
const SILENT_COMMANDS: &[&str] = &[
    "vspace",
    "hspace",
    "vskip",
    "hskip",
    "setlength",
    "addtolength",
    "label",
    "pagestyle",
    "thispagestyle",
    "includegraphics",
    "color",
    "definecolor",
    "titleformat",
    "titlespacing",
    "newcommand",
    "renewcommand",
    "usepackage",
    "documentclass",
    "input",
    "fontsize",
    "hfill",
    "vfill",
];

/// Commands whose first argument is a target (URL, key) rather than text.
const TARGET_COMMANDS: &[&str] = &["href"];

/// Reconstructs the printed lines of a resume source.
///
/// Plain text keeps blank lines (they take vertical space); LaTeX drops them
/// because TeX collapses them into paragraph breaks.
pub fn visible_lines(source: &str, format: SourceFormat) -> Vec<VisibleLine> {
    match format {
        SourceFormat::PlainText => source
            .lines()
            .map(|line| VisibleLine {
                text: line.split_whitespace().collect::<Vec<_>>().join(" "),
                is_heading: false,
            })
            .collect(),
        SourceFormat::Latex => latex_visible_lines(source),
    }
}

/// Total printed lines, including heading spacing. A blank plain-text line
/// still counts as one line.
pub fn count_printed_lines(
    lines: &[VisibleLine],
    metrics: &FontMetricTable,
    config: &PageConfig,
) -> f32 {
    lines
        .iter()
        .map(|line| {
            let wrapped = metrics.wrapped_lines(&line.text, config).max(1) as f32;
            if line.is_heading {
                wrapped + config.heading_spacing_lines
            } else {
                wrapped
            }
        })
        .sum()
}

fn latex_visible_lines(source: &str) -> Vec<VisibleLine> {
    let body = document_body(source);
    // A comment also swallows its line end, as in TeX.
    let mut stripped = String::with_capacity(body.len());
    for line in body.lines() {
        let kept = strip_comment(line);
        stripped.push_str(kept);
        if kept.len() == line.len() {
            stripped.push('\n');
        }
    }

    let chars: Vec<char> = stripped.chars().collect();
    let mut out = LineCollector::default();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let next = chars.get(i + 1).copied();
                match next {
                    Some('\\') => {
                        out.break_line();
                        i += 2;
                        // `\\[4pt]` spacing argument
                        i = skip_groups(&chars, i, Some(1), true);
                    }
                    Some(c) if c.is_ascii_alphabetic() => {
                        let start = i + 1;
                        let mut end = start;
                        while end < chars.len() && chars[end].is_ascii_alphabetic() {
                            end += 1;
                        }
                        let name: String = chars[start..end].iter().collect();
                        i = end;
                        if chars.get(i) == Some(&'*') {
                            i += 1;
                        }
                        let name = name.as_str();
                        if HEADING_COMMANDS.contains(&name) {
                            out.break_line();
                            out.is_heading = true;
                        } else if BREAK_COMMANDS.contains(&name) {
                            out.break_line();
                        } else if ENVIRONMENT_COMMANDS.contains(&name) {
                            out.break_line();
                            i = skip_groups(&chars, i, None, false);
                        } else if SILENT_COMMANDS.contains(&name) {
                            i = skip_groups(&chars, i, None, false);
                        } else if TARGET_COMMANDS.contains(&name) {
                            i = skip_groups(&chars, i, Some(1), false);
                        }
                    }
                    // Escaped character such as \% or \&.
                    Some(c) => {
                        out.push(c);
                        i += 2;
                    }
                    None => i += 1,
                }
            }
            // A single newline is a space to TeX; a blank line ends the paragraph.
            '\n' => {
                let mut j = i + 1;
                while matches!(chars.get(j), Some(' ' | '\t' | '\r')) {
                    j += 1;
                }
                if chars.get(j) == Some(&'\n') {
                    out.break_line();
                } else {
                    out.push(' ');
                }
                i += 1;
            }
            '{' | '}' | '$' => i += 1,
            '&' | '~' => {
                out.push(' ');
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out.finish()
}

/// Everything between `\begin{document}` and `\end{document}`, or the whole
/// source when the markers are missing.
fn document_body(source: &str) -> &str {
    const BEGIN: &str = r"\begin{document}";
    let body = match source.find(BEGIN) {
        Some(idx) => &source[idx + BEGIN.len()..],
        None => source,
    };
    match body.find(r"\end{document}") {
        Some(idx) => &body[..idx],
        None => body,
    }
}

/// Drops a `%` comment, honouring `\%` escapes.
fn strip_comment(line: &str) -> &str {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            '%' if !escaped => return &line[..idx],
            _ => escaped = false,
        }
    }
    line
}

/// Skips consecutive `{...}` / `[...]` argument groups starting at `i`.
///
/// `limit` caps the number of brace groups skipped; optional `[...]` groups
/// never count against it. With `optional_only`, only `[...]` groups are skipped.
fn skip_groups(chars: &[char], mut i: usize, limit: Option<usize>, optional_only: bool) -> usize {
    let mut skipped = 0usize;
    loop {
        match chars.get(i) {
            Some('[') => i = skip_balanced(chars, i, '[', ']'),
            Some('{') if !optional_only => {
                if limit.is_some_and(|max| skipped >= max) {
                    return i;
                }
                i = skip_balanced(chars, i, '{', '}');
                skipped += 1;
            }
            _ => return i,
        }
    }
}

/// Returns the index just past the group closing the one opened at `i`.
fn skip_balanced(chars: &[char], mut i: usize, open: char, close: char) -> usize {
    let mut depth = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return i + 1;
            }
        }
        i += 1;
    }
    chars.len()
}

#[derive(Default)]
struct LineCollector {
    current: String,
    is_heading: bool,
    lines: Vec<VisibleLine>,
}

impl LineCollector {
    fn push(&mut self, c: char) {
        self.current.push(c);
    }

    fn break_line(&mut self) {
        let text = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            self.lines.push(VisibleLine {
                text,
                is_heading: self.is_heading,
            });
            self.is_heading = false;
        }
        self.current.clear();
    }

    fn finish(mut self) -> Vec<VisibleLine> {
        self.break_line();
        self.lines
    }
}
