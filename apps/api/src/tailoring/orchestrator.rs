//! Tailoring orchestrator.
//!
//! Drives one run as an explicit state machine:
//!
//! ```text
//! Attempting ──► Evaluating ──► Accepted
//!     ▲              │
//!     └── Retrying ◄─┘
//! ```
//!
//! Attempting calls the model and measures the result (compiled PDF when the
//! format compiles and the compiler succeeds, text heuristic otherwise).
//! Evaluating consults the pure [`decide`] policy. Only model failures abort a
//! run; compiler failures degrade to the text estimate.
//!
//! Runs are exclusive: a second request while one is in flight gets
//! [`TailorError::Busy`]. Dropping the returned future (client disconnect)
//! stops the loop at the next await point and releases the run; the resume
//! slot is only ever read here.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::compiler::LatexCompiler;
use crate::layout::{PageFit, PageFitEstimator};
use crate::llm_client::{GenerationRequest, ResumeGenerator};
use crate::models::resume::{ResumeDocument, SourceFormat};
use crate::models::tailoring::{
    AdjustmentInstruction, AdjustmentType, AttemptSummary, TailoringAttempt, TailoringResult,
};
use crate::store::ResumeStore;
use crate::tailoring::artifacts::ArtifactStore;
use crate::tailoring::policy::{decide, Decision, FitPolicy};
use crate::tailoring::TailorError;

enum Phase {
    Attempting {
        instruction: AdjustmentInstruction,
    },
    Evaluating {
        attempt: TailoringAttempt,
        pdf: Option<Bytes>,
    },
    Retrying {
        next: AdjustmentInstruction,
    },
    Accepted {
        attempt: TailoringAttempt,
        pdf: Option<Bytes>,
    },
}

pub struct Tailor {
    store: Arc<ResumeStore>,
    generator: Arc<dyn ResumeGenerator>,
    compiler: Arc<dyn LatexCompiler>,
    estimator: PageFitEstimator,
    artifacts: ArtifactStore,
    policy: FitPolicy,
}

impl Tailor {
    pub fn new(
        store: Arc<ResumeStore>,
        generator: Arc<dyn ResumeGenerator>,
        compiler: Arc<dyn LatexCompiler>,
        artifacts: ArtifactStore,
        policy: FitPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            compiler,
            estimator: PageFitEstimator::default(),
            artifacts,
            policy,
        }
    }

    /// Tailors the loaded resume to `job_description`.
    pub async fn tailor(&self, job_description: &str) -> Result<TailoringResult, TailorError> {
        let _guard = self.store.begin_tailoring().ok_or(TailorError::Busy)?;
        let resume = self
            .store
            .get_resume()
            .await
            .ok_or(TailorError::NoResumeLoaded)?;
        let context = self.store.get_context().await;

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "tailor",
            %run_id,
            file = %resume.original_filename,
            format = resume.source_format.as_str(),
        );
        self.run(&resume, &context.text, job_description)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        resume: &ResumeDocument,
        context: &str,
        job_description: &str,
    ) -> Result<TailoringResult, TailorError> {
        let format = resume.source_format;
        let mut history: Vec<TailoringAttempt> = Vec::new();
        let mut summaries: Vec<AttemptSummary> = Vec::new();
        let mut phase = Phase::Attempting {
            instruction: AdjustmentInstruction::None,
        };

        let (terminal, pdf) = loop {
            phase = match phase {
                Phase::Attempting { instruction } => {
                    let previous = history.last();
                    let request = GenerationRequest {
                        job_description,
                        resume_source: previous
                            .map(|a| a.generated_text.as_str())
                            .unwrap_or(resume.source_text.as_str()),
                        original_source: &resume.source_text,
                        background_context: context,
                        format,
                        instruction,
                        previous_fit: previous.map(TailoringAttempt::fit),
                        target_low: self.policy.low,
                        target_high: self.policy.high,
                    };
                    let generated_text = self.generator.generate(&request).await?;
                    let (fit, pdf) = self.measure(&generated_text, format).await?;

                    Phase::Evaluating {
                        attempt: TailoringAttempt {
                            attempt_index: history.len() as u32,
                            prompt_instruction: instruction,
                            generated_text,
                            page_count: fit.page_count,
                            fill_ratio: fit.fill_ratio,
                            fit_method: fit.method,
                            compiled: pdf.is_some(),
                        },
                        pdf,
                    }
                }
                Phase::Evaluating { attempt, pdf } => {
                    let decision = decide(&attempt, &history, &self.policy);
                    info!(
                        attempt = attempt.attempt_index,
                        instruction = attempt.prompt_instruction.as_str(),
                        page_count = attempt.page_count,
                        fill_ratio = ?attempt.fill_ratio,
                        method = ?attempt.fit_method,
                        decision = decision.reason.as_str(),
                        "evaluated attempt"
                    );
                    summaries.push(summarize(&attempt, &decision));
                    if decision.is_accept() {
                        Phase::Accepted { attempt, pdf }
                    } else {
                        history.push(attempt);
                        Phase::Retrying {
                            next: decision.next_instruction,
                        }
                    }
                }
                Phase::Retrying { next } => {
                    debug!(next = next.as_str(), "retrying with adjusted instruction");
                    Phase::Attempting { instruction: next }
                }
                Phase::Accepted { attempt, pdf } => break (attempt, pdf),
            };
        };

        let compiled_artifact = match pdf {
            Some(pdf) => match self.artifacts.publish(resume.stem(), &pdf).await {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    warn!("Failed to publish compiled resume: {e}");
                    None
                }
            },
            None => None,
        };

        let adjustment_count = terminal.attempt_index;
        info!(
            adjustment_count,
            page_count = terminal.page_count,
            fill_ratio = ?terminal.fill_ratio,
            compiled = compiled_artifact.is_some(),
            "tailoring finished"
        );

        Ok(TailoringResult {
            file_format: format,
            original_filename: resume.original_filename.clone(),
            page_count: terminal.page_count,
            fill_ratio: terminal.fill_ratio,
            was_adjusted: adjustment_count > 0,
            adjustment_type: AdjustmentType::from(terminal.prompt_instruction),
            adjustment_count,
            compiled_artifact,
            attempts: summaries,
            final_text: terminal.generated_text,
        })
    }

    /// Measures generated text. Returns the PDF bytes when compilation
    /// succeeded so the terminal attempt can be published.
    async fn measure(
        &self,
        text: &str,
        format: SourceFormat,
    ) -> Result<(PageFit, Option<Bytes>), TailorError> {
        if format.supports_compilation() {
            match self.compiler.compile(text).await {
                Ok(compiled) => {
                    if let Some(fit) = self.estimator.from_artifact(&compiled) {
                        return Ok((fit, Some(compiled.pdf)));
                    }
                    warn!("pdflatex did not report a page count, estimating fit from text");
                    debug!(log = %compiled.log, "pdflatex log tail");
                    let fit = self.estimate_text(text, format).await?;
                    return Ok((fit, Some(compiled.pdf)));
                }
                Err(e) => {
                    warn!("LaTeX compilation failed, estimating fit from text: {e}");
                    if let Some(log) = e.log() {
                        debug!(log, "pdflatex log tail");
                    }
                }
            }
        }
        let fit = self.estimate_text(text, format).await?;
        Ok((fit, None))
    }

    async fn estimate_text(&self, text: &str, format: SourceFormat) -> Result<PageFit, TailorError> {
        let estimator = self.estimator.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || estimator.from_text(&text, format))
            .await
            .map_err(|e| TailorError::Internal(format!("fit estimation task failed: {e}")))
    }
}

fn summarize(attempt: &TailoringAttempt, decision: &Decision) -> AttemptSummary {
    AttemptSummary {
        index: attempt.attempt_index,
        instruction: attempt.prompt_instruction,
        page_count: attempt.page_count,
        fill_ratio: attempt.fill_ratio,
        method: attempt.fit_method,
        compiled: attempt.compiled,
        decision: decision.reason.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::compiler::{CompileError, CompiledPdf, PageMeasure};
    use crate::db::test_pool;
    use crate::layout::FitMethod;
    use crate::llm_client::LlmError;

    /// Returns scripted outputs in order and records what it was asked.
    struct ScriptedGenerator {
        outputs: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<(AdjustmentInstruction, String)>>,
    }

    impl ScriptedGenerator {
        fn new(outputs: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(AdjustmentInstruction, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResumeGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.instruction, request.resume_source.to_string()));
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    /// Compiles known texts to fixed measurements; unknown texts fail.
    struct FakeCompiler {
        fits: HashMap<String, (u32, f32)>,
    }

    impl FakeCompiler {
        fn new(fits: &[(&str, u32, f32)]) -> Arc<Self> {
            Arc::new(Self {
                fits: fits
                    .iter()
                    .map(|(text, pages, fill)| (text.to_string(), (*pages, *fill)))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl LatexCompiler for FakeCompiler {
        async fn compile(&self, source: &str) -> Result<CompiledPdf, CompileError> {
            let (pages, fill) = self.fits.get(source).copied().ok_or_else(|| {
                CompileError::Failed {
                    summary: "! Undefined control sequence.".into(),
                    log: "l.1".into(),
                }
            })?;
            Ok(CompiledPdf {
                pdf: Bytes::from(format!("%PDF {source}")),
                page_count: Some(pages),
                last_page: Some(PageMeasure {
                    used_pt: fill * 600.0,
                    goal_pt: 600.0,
                }),
                log: String::new(),
            })
        }
    }

    struct Harness {
        store: Arc<ResumeStore>,
        tailor: Tailor,
        _artifact_dir: tempfile::TempDir,
    }

    async fn harness(
        generator: Arc<ScriptedGenerator>,
        compiler: Arc<dyn LatexCompiler>,
        policy: FitPolicy,
        resume: Option<&str>,
    ) -> Harness {
        let store = Arc::new(ResumeStore::new(test_pool().await));
        if let Some(text) = resume {
            store
                .load_resume(ResumeDocument::new(
                    text.to_string(),
                    SourceFormat::Latex,
                    "jane.tex".into(),
                ))
                .await;
        }
        let dir = tempfile::tempdir().unwrap();
        let tailor = Tailor::new(
            Arc::clone(&store),
            generator,
            compiler,
            ArtifactStore::new(dir.path()),
            policy,
        );
        Harness {
            store,
            tailor,
            _artifact_dir: dir,
        }
    }

    fn items(n: usize) -> String {
        let body: String = (0..n)
            .map(|i| format!("\\item Shipped feature {i}\n"))
            .collect();
        format!("\\documentclass{{article}}\n\\begin{{document}}\n{body}\\end{{document}}\n")
    }

    #[tokio::test]
    async fn test_underfill_expands_once_then_accepts() {
        let generator = ScriptedGenerator::new(vec![Ok("v0".into()), Ok("v1".into())]);
        let compiler = FakeCompiler::new(&[("v0", 1, 0.70), ("v1", 1, 0.92)]);
        let h = harness(generator.clone(), compiler, FitPolicy::default(), Some("original")).await;

        let result = h.tailor.tailor("Rust engineer").await.unwrap();

        assert_eq!(result.final_text, "v1");
        assert!(result.was_adjusted);
        assert_eq!(result.adjustment_type, AdjustmentType::Expanded);
        assert_eq!(result.adjustment_count, 1);
        assert_eq!(result.page_count, 1);
        assert!((result.fill_ratio.unwrap() - 0.92).abs() < 1e-4);
        assert_eq!(result.original_filename, "jane.tex");

        let artifact = result.compiled_artifact.unwrap();
        assert_eq!(artifact.url, "/compiled/jane.pdf");

        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (AdjustmentInstruction::None, "original".to_string()));
        // The adjustment edits the previous output, not the upload.
        assert_eq!(calls[1], (AdjustmentInstruction::Expand, "v0".to_string()));

        assert_eq!(result.attempts.len(), 2);
        assert_eq!(result.attempts[0].decision, "under_filled");
        assert_eq!(result.attempts[1].decision, "within_target");
    }

    #[tokio::test]
    async fn test_overflow_then_overfill_stops_at_attempt_cap() {
        let generator = ScriptedGenerator::new(vec![
            Ok("v0".into()),
            Ok("v1".into()),
            Ok("v2".into()),
        ]);
        let compiler = FakeCompiler::new(&[("v0", 2, 0.40), ("v1", 1, 0.99), ("v2", 1, 0.80)]);
        let policy = FitPolicy::new(0.88, 0.96, 2).unwrap();
        let h = harness(generator.clone(), compiler, policy, Some("original")).await;

        let result = h.tailor.tailor("Rust engineer").await.unwrap();

        assert_eq!(result.final_text, "v2");
        assert_eq!(result.adjustment_count, 2);
        assert_eq!(result.adjustment_type, AdjustmentType::Shortened);
        assert_eq!(result.page_count, 1);
        let instructions: Vec<_> = generator.calls().into_iter().map(|(i, _)| i).collect();
        assert_eq!(
            instructions,
            vec![
                AdjustmentInstruction::None,
                AdjustmentInstruction::Shorten,
                AdjustmentInstruction::Shorten,
            ]
        );
        assert_eq!(result.attempts[0].decision, "page_overflow");
        assert_eq!(result.attempts[2].decision, "attempt_cap");
    }

    #[tokio::test]
    async fn test_expand_then_overfill_accepts_instead_of_oscillating() {
        let generator = ScriptedGenerator::new(vec![Ok("v0".into()), Ok("v1".into())]);
        let compiler = FakeCompiler::new(&[("v0", 1, 0.70), ("v1", 1, 0.99)]);
        let h = harness(generator.clone(), compiler, FitPolicy::default(), Some("original")).await;

        let result = h.tailor.tailor("Rust engineer").await.unwrap();

        assert_eq!(result.final_text, "v1");
        assert_eq!(result.adjustment_count, 1);
        assert_eq!(generator.calls().len(), 2);
        assert_eq!(result.attempts[1].decision, "oscillation_guard");
    }

    #[tokio::test]
    async fn test_model_calls_are_bounded() {
        // Always two pages: the loop still stops after max_attempts + 1 calls.
        let outputs = (0..10).map(|i| Ok(format!("v{i}"))).collect();
        let generator = ScriptedGenerator::new(outputs);
        let fits: Vec<(String, u32, f32)> = (0..10).map(|i| (format!("v{i}"), 2, 0.5)).collect();
        let fits: Vec<(&str, u32, f32)> = fits.iter().map(|(t, p, f)| (t.as_str(), *p, *f)).collect();
        let compiler = FakeCompiler::new(&fits);
        let policy = FitPolicy::default();
        let h = harness(generator.clone(), compiler, policy, Some("original")).await;

        let result = h.tailor.tailor("Rust engineer").await.unwrap();

        assert_eq!(generator.calls().len() as u32, policy.max_attempts + 1);
        assert_eq!(result.adjustment_count, policy.max_attempts);
        assert_eq!(result.page_count, 2);
    }

    #[tokio::test]
    async fn test_no_resume_fails_without_calling_model() {
        let generator = ScriptedGenerator::new(vec![Ok("v0".into())]);
        let h = harness(
            generator.clone(),
            FakeCompiler::new(&[]),
            FitPolicy::default(),
            None,
        )
        .await;

        let err = h.tailor.tailor("Rust engineer").await.unwrap_err();
        assert!(matches!(err, TailorError::NoResumeLoaded));
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_compile_failure_degrades_to_text_estimate() {
        let short = items(10);
        let full = items(45);
        let generator = ScriptedGenerator::new(vec![Ok(short.clone()), Ok(full.clone())]);
        // The fake compiler knows neither text, so every compile fails.
        let h = harness(
            generator.clone(),
            FakeCompiler::new(&[]),
            FitPolicy::default(),
            Some("original"),
        )
        .await;

        let result = h.tailor.tailor("Rust engineer").await.unwrap();

        assert_eq!(result.final_text, full);
        assert!(result.compiled_artifact.is_none());
        assert_eq!(result.page_count, 1);
        assert!((result.fill_ratio.unwrap() - 0.9).abs() < 1e-3);
        assert_eq!(result.adjustment_type, AdjustmentType::Expanded);
        assert!(result
            .attempts
            .iter()
            .all(|a| a.method == FitMethod::TextHeuristic && !a.compiled));
    }

    #[tokio::test]
    async fn test_artifact_only_published_for_terminal_attempt() {
        // v0 compiles, v1 does not: the accepted attempt has no PDF.
        let generator = ScriptedGenerator::new(vec![Ok("v0".into()), Ok(items(45))]);
        let compiler = FakeCompiler::new(&[("v0", 2, 0.5)]);
        let h = harness(generator, compiler, FitPolicy::default(), Some("original")).await;

        let result = h.tailor.tailor("Rust engineer").await.unwrap();

        assert!(result.compiled_artifact.is_none());
        assert!(result.attempts[0].compiled);
        assert!(!result.attempts[1].compiled);
    }

    #[tokio::test]
    async fn test_upstream_error_aborts_run() {
        let generator = ScriptedGenerator::new(vec![
            Ok("v0".into()),
            Err(LlmError::Api {
                status: 500,
                message: "overloaded".into(),
            }),
        ]);
        let compiler = FakeCompiler::new(&[("v0", 1, 0.5)]);
        let h = harness(generator, compiler, FitPolicy::default(), Some("original")).await;

        let err = h.tailor.tailor("Rust engineer").await.unwrap_err();
        assert!(matches!(err, TailorError::Upstream(_)));
        // The run released its claim.
        assert!(h.store.begin_tailoring().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_run_is_busy() {
        let generator = ScriptedGenerator::new(vec![Ok("v0".into())]);
        let h = harness(
            generator.clone(),
            FakeCompiler::new(&[("v0", 1, 0.9)]),
            FitPolicy::default(),
            Some("original"),
        )
        .await;

        let guard = h.store.begin_tailoring().unwrap();
        let err = h.tailor.tailor("Rust engineer").await.unwrap_err();
        assert!(matches!(err, TailorError::Busy));
        assert!(generator.calls().is_empty());

        drop(guard);
        let result = h.tailor.tailor("Rust engineer").await.unwrap();
        assert!(!result.was_adjusted);
        assert_eq!(result.adjustment_type, AdjustmentType::None);
    }

    #[tokio::test]
    async fn test_missing_credential_surfaces_auth_error() {
        let generator = ScriptedGenerator::new(vec![Err(LlmError::MissingApiKey)]);
        let h = harness(
            generator,
            FakeCompiler::new(&[]),
            FitPolicy::default(),
            Some("original"),
        )
        .await;
        let err = h.tailor.tailor("Rust engineer").await.unwrap_err();
        assert_eq!(err.kind(), "LLM_AUTH_ERROR");
    }
}
