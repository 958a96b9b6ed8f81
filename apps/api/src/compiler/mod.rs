//! LaTeX compilation collaborator.
//!
//! The orchestrator only sees the [`LatexCompiler`] trait, so the fit loop can
//! run against a fake in tests. [`PdfLatexCompiler`] shells out to pdflatex in
//! a scratch directory that is removed on every exit path (the `TempDir` guard
//! is dropped on success, failure and timeout alike, and the child process is
//! killed when the time bound elapses).
//!
//! Compilation failures are never fatal to tailoring; callers log them and fall
//! back to text-based estimation.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub mod probe;

pub use probe::PageMeasure;

use probe::{first_error, inject_probe, parse_page_count, parse_probe};

/// Job name of the scratch document; pdflatex derives `.pdf` / `.log` from it.
const JOB_NAME: &str = "resume";
/// How much of the TeX log is kept for diagnostics.
const LOG_TAIL_CHARS: usize = 2000;

/// A successfully compiled resume, held in memory until the orchestrator
/// decides whether to publish it.
#[derive(Debug, Clone)]
pub struct CompiledPdf {
    pub pdf: Bytes,
    /// Page count reported by pdfTeX, if the log contained it.
    pub page_count: Option<u32>,
    /// Last-page measurement written by the probe.
    pub last_page: Option<PageMeasure>,
    pub log: String,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(
        "pdflatex binary '{binary}' not found. Install a LaTeX distribution \
         (e.g. TeX Live or MiKTeX) and ensure it is on your PATH."
    )]
    NotInstalled { binary: String },

    #[error("LaTeX compilation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("LaTeX compilation failed: {summary}")]
    Failed { summary: String, log: String },

    #[error("LaTeX compilation did not produce a PDF file")]
    NoOutput { log: String },

    #[error("I/O error during LaTeX compilation: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    /// Tail of the TeX log, when one was captured.
    pub fn log(&self) -> Option<&str> {
        match self {
            CompileError::Failed { log, .. } | CompileError::NoOutput { log } => Some(log),
            _ => None,
        }
    }
}

/// Compiles LaTeX source into a PDF.
#[async_trait]
pub trait LatexCompiler: Send + Sync {
    async fn compile(&self, source: &str) -> Result<CompiledPdf, CompileError>;
}

/// Runs `pdflatex` as an external process with a bounded wait.
pub struct PdfLatexCompiler {
    binary: String,
    timeout: Duration,
}

impl PdfLatexCompiler {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl LatexCompiler for PdfLatexCompiler {
    async fn compile(&self, source: &str) -> Result<CompiledPdf, CompileError> {
        let workdir = tempfile::Builder::new()
            .prefix("tailor-latex-")
            .tempdir()?;
        let tex_file = format!("{JOB_NAME}.tex");
        tokio::fs::write(workdir.path().join(&tex_file), inject_probe(source)).await?;

        let mut command = Command::new(&self.binary);
        command
            .arg("-interaction=nonstopmode")
            .arg("-no-shell-escape")
            .arg(&tex_file)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(CompileError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(CompileError::NotInstalled {
                    binary: self.binary.clone(),
                })
            }
            Ok(Err(e)) => return Err(CompileError::Io(e)),
            Ok(Ok(output)) => output,
        };

        // pdfTeX writes the full transcript to the .log file; stdout is a
        // line-wrapped copy and only used when the log is missing.
        let log = match read_log(workdir.path()).await {
            Some(log) => log,
            None => String::from_utf8_lossy(&output.stdout).into_owned(),
        };

        if !output.status.success() {
            let summary = first_error(&log)
                .map(str::to_string)
                .or_else(|| {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let stderr = stderr.trim();
                    (!stderr.is_empty()).then(|| truncate(stderr, 300))
                })
                .unwrap_or_else(|| "Unknown LaTeX compilation error".to_string());
            return Err(CompileError::Failed {
                summary,
                log: log_tail(&log),
            });
        }

        let pdf = match tokio::fs::read(workdir.path().join(format!("{JOB_NAME}.pdf"))).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CompileError::NoOutput { log: log_tail(&log) })
            }
            Err(e) => return Err(CompileError::Io(e)),
        };

        let page_count = parse_page_count(&log);
        let last_page = parse_probe(&log);
        debug!(
            bytes = pdf.len(),
            ?page_count,
            ?last_page,
            "pdflatex produced a PDF"
        );

        Ok(CompiledPdf {
            pdf,
            page_count,
            last_page,
            log: log_tail(&log),
        })
    }
}

/// TeX logs are not guaranteed to be UTF-8, so they are decoded lossily.
async fn read_log(dir: &Path) -> Option<String> {
    let bytes = tokio::fs::read(dir.join(format!("{JOB_NAME}.log"))).await.ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn log_tail(log: &str) -> String {
    let count = log.chars().count();
    if count <= LOG_TAIL_CHARS {
        return log.to_string();
    }
    log.chars().skip(count - LOG_TAIL_CHARS).collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
