use serde::Serialize;

use crate::layout::{FitMethod, PageFit};
use crate::models::resume::SourceFormat;

/// Length directive appended to the generation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentInstruction {
    None,
    Expand,
    Shorten,
}

impl AdjustmentInstruction {
    /// The instruction that would undo this one.
    pub fn opposite(&self) -> Option<AdjustmentInstruction> {
        match self {
            AdjustmentInstruction::None => None,
            AdjustmentInstruction::Expand => Some(AdjustmentInstruction::Shorten),
            AdjustmentInstruction::Shorten => Some(AdjustmentInstruction::Expand),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentInstruction::None => "none",
            AdjustmentInstruction::Expand => "expand",
            AdjustmentInstruction::Shorten => "shorten",
        }
    }
}

/// How the returned resume was adjusted, reported to the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    None,
    Expanded,
    Shortened,
}

impl From<AdjustmentInstruction> for AdjustmentType {
    fn from(instruction: AdjustmentInstruction) -> Self {
        match instruction {
            AdjustmentInstruction::None => AdjustmentType::None,
            AdjustmentInstruction::Expand => AdjustmentType::Expanded,
            AdjustmentInstruction::Shorten => AdjustmentType::Shortened,
        }
    }
}

/// One pass through the generate / measure loop. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct TailoringAttempt {
    pub attempt_index: u32,
    /// Instruction the model was given to produce this attempt.
    pub prompt_instruction: AdjustmentInstruction,
    pub generated_text: String,
    pub page_count: u32,
    pub fill_ratio: Option<f32>,
    pub fit_method: FitMethod,
    /// Whether this attempt's source compiled to a PDF.
    pub compiled: bool,
}

impl TailoringAttempt {
    pub fn fit(&self) -> PageFit {
        PageFit {
            page_count: self.page_count,
            fill_ratio: self.fill_ratio,
            method: self.fit_method,
        }
    }
}

/// Location of a published compiled resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub file_name: String,
    pub url: String,
}

/// Per-attempt line of the `attempts` summary in the tailor response.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub index: u32,
    pub instruction: AdjustmentInstruction,
    pub page_count: u32,
    pub fill_ratio: Option<f32>,
    pub method: FitMethod,
    pub compiled: bool,
    /// Policy reason recorded for this attempt, e.g. `under_filled` or `within_target`.
    pub decision: &'static str,
}

/// Outcome of a tailoring run, derived from the terminal attempt.
#[derive(Debug, Clone)]
pub struct TailoringResult {
    pub final_text: String,
    pub file_format: SourceFormat,
    pub original_filename: String,
    pub page_count: u32,
    pub fill_ratio: Option<f32>,
    pub was_adjusted: bool,
    pub adjustment_type: AdjustmentType,
    pub adjustment_count: u32,
    pub compiled_artifact: Option<ArtifactRef>,
    pub attempts: Vec<AttemptSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_instructions() {
        assert_eq!(
            AdjustmentInstruction::Expand.opposite(),
            Some(AdjustmentInstruction::Shorten)
        );
        assert_eq!(
            AdjustmentInstruction::Shorten.opposite(),
            Some(AdjustmentInstruction::Expand)
        );
        assert_eq!(AdjustmentInstruction::None.opposite(), None);
    }

    #[test]
    fn test_adjustment_type_serializes_lowercase() {
        let json = serde_json::to_string(&AdjustmentType::from(AdjustmentInstruction::Shorten)).unwrap();
        assert_eq!(json, "\"shortened\"");
        assert_eq!(
            AdjustmentType::from(AdjustmentInstruction::None),
            AdjustmentType::None
        );
    }
}
