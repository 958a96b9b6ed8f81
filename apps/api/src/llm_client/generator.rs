//! Resume generation on top of the chat client.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::layout::PageFit;
use crate::llm_client::extract::{extract_latex, strip_fences};
use crate::llm_client::prompts::{
    ADJUST_JD_CHARS, EXPAND_PROMPT_TEMPLATE, EXPAND_SYSTEM, LATEX_OUTPUT_RULES, NO_CONTEXT,
    PLAIN_TEXT_OUTPUT_RULES, SHORTEN_PROMPT_TEMPLATE, SHORTEN_SYSTEM, TAILOR_PROMPT_TEMPLATE,
    TAILOR_SYSTEM,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::resume::SourceFormat;
use crate::models::tailoring::AdjustmentInstruction;

/// Everything the model needs for one tailoring attempt.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub job_description: &'a str,
    /// Source to edit: the uploaded resume on the first attempt, the previous
    /// attempt's output afterwards.
    pub resume_source: &'a str,
    /// The uploaded resume; its preamble is reused when the model drops it.
    pub original_source: &'a str,
    pub background_context: &'a str,
    pub format: SourceFormat,
    pub instruction: AdjustmentInstruction,
    /// Measured fit of `resume_source`, for adjustment attempts.
    pub previous_fit: Option<PageFit>,
    pub target_low: f32,
    pub target_high: f32,
}

/// Produces tailored resume source text.
#[async_trait]
pub trait ResumeGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError>;
}

#[async_trait]
impl ResumeGenerator for LlmClient {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
        let (system, prompt) = build_prompt(request);
        debug!(
            instruction = request.instruction.as_str(),
            prompt_chars = prompt.len(),
            "calling model"
        );

        let raw = self.complete(&prompt, system).await?;

        let text = match request.format {
            SourceFormat::Latex => extract_latex(&raw, request.original_source)?,
            SourceFormat::PlainText => {
                let text = strip_fences(&raw);
                if text.is_empty() {
                    return Err(LlmError::EmptyContent);
                }
                text.to_string()
            }
        };
        info!(
            model = self.model(),
            chars = text.len(),
            "model returned tailored resume"
        );
        Ok(text)
    }
}

/// Returns `(system, user)` prompts for a request.
pub fn build_prompt(request: &GenerationRequest<'_>) -> (&'static str, String) {
    let output_rules = match request.format {
        SourceFormat::Latex => LATEX_OUTPUT_RULES,
        SourceFormat::PlainText => PLAIN_TEXT_OUTPUT_RULES,
    };

    let context = if request.background_context.trim().is_empty() {
        NO_CONTEXT
    } else {
        request.background_context
    };

    match request.instruction {
        AdjustmentInstruction::None => {
            let prompt = TAILOR_PROMPT_TEMPLATE
                .replace("{output_rules}", output_rules)
                .replace("{context}", context)
                .replace("{job_description}", request.job_description)
                .replace("{resume}", request.resume_source);
            (TAILOR_SYSTEM, prompt)
        }
        AdjustmentInstruction::Expand | AdjustmentInstruction::Shorten => {
            let (system, template) = if request.instruction == AdjustmentInstruction::Expand {
                (EXPAND_SYSTEM, EXPAND_PROMPT_TEMPLATE)
            } else {
                (SHORTEN_SYSTEM, SHORTEN_PROMPT_TEMPLATE)
            };
            let job_description: String =
                request.job_description.chars().take(ADJUST_JD_CHARS).collect();
            let prompt = template
                .replace("{output_rules}", output_rules)
                .replace("{current_fit}", &describe_fit(request.previous_fit))
                .replace("{target_low}", &format!("{:.2}", request.target_low))
                .replace("{target_high}", &format!("{:.2}", request.target_high))
                .replace("{context}", context)
                .replace("{job_description}", &job_description)
                .replace("{resume}", request.resume_source);
            (system, prompt)
        }
    }
}

fn describe_fit(fit: Option<PageFit>) -> String {
    match fit {
        Some(fit) if fit.page_count > 1 => {
            format!("{} pages, it must fit on ONE page", fit.page_count)
        }
        Some(PageFit {
            fill_ratio: Some(ratio),
            ..
        }) => format!("fill ratio {ratio:.2} on one page"),
        _ => "fill ratio unknown".to_string(),
    }
}
