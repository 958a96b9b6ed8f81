//! Fit-adjustment policy.
//!
//! A pure function from the latest attempt (plus the attempts before it) to
//! the next step of the loop. No I/O, no clock, no randomness.
//!
//! Rules, first match wins:
//! 1. `attempt_index >= max_attempts`: accept whatever was reached.
//! 2. More than one page: retry with SHORTEN.
//! 3. Fill below `low`: retry with EXPAND.
//! 4. Fill above `high`: retry with SHORTEN.
//! 5. Otherwise (in range, or unknown): accept.
//!
//! A ratio-driven retry that would undo the most recent adjustment (EXPAND
//! after SHORTEN or the reverse) is turned into an accept. Page overflow is
//! exempt: a multi-page resume is never accepted before the attempt cap.

use serde::Serialize;

use crate::models::tailoring::{AdjustmentInstruction, TailoringAttempt};

pub const DEFAULT_LOW_THRESHOLD: f32 = 0.88;
pub const DEFAULT_HIGH_THRESHOLD: f32 = 0.96;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Tunable bounds of the policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPolicy {
    pub low: f32,
    pub high: f32,
    /// Highest attempt index; the loop makes at most `max_attempts + 1` model calls.
    pub max_attempts: u32,
}

impl Default for FitPolicy {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_THRESHOLD,
            high: DEFAULT_HIGH_THRESHOLD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl FitPolicy {
    pub fn new(low: f32, high: f32, max_attempts: u32) -> Result<Self, String> {
        if !low.is_finite() || !high.is_finite() {
            return Err("fit thresholds must be finite numbers".to_string());
        }
        if low <= 0.0 {
            return Err(format!("low fit threshold must be positive, got {low}"));
        }
        if low > high {
            return Err(format!(
                "low fit threshold {low} is greater than high threshold {high}"
            ));
        }
        Ok(Self {
            low,
            high,
            max_attempts,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitAction {
    Accept,
    Retry,
}

/// Why the policy decided what it did. Logged and echoed in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    AttemptCap,
    PageOverflow,
    UnderFilled,
    OverFilled,
    WithinTarget,
    FillUnknown,
    OscillationGuard,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::AttemptCap => "attempt_cap",
            DecisionReason::PageOverflow => "page_overflow",
            DecisionReason::UnderFilled => "under_filled",
            DecisionReason::OverFilled => "over_filled",
            DecisionReason::WithinTarget => "within_target",
            DecisionReason::FillUnknown => "fill_unknown",
            DecisionReason::OscillationGuard => "oscillation_guard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: FitAction,
    /// Instruction for the next attempt; `None` whenever the action is Accept.
    pub next_instruction: AdjustmentInstruction,
    pub reason: DecisionReason,
}

impl Decision {
    fn accept(reason: DecisionReason) -> Self {
        Self {
            action: FitAction::Accept,
            next_instruction: AdjustmentInstruction::None,
            reason,
        }
    }

    fn retry(next_instruction: AdjustmentInstruction, reason: DecisionReason) -> Self {
        Self {
            action: FitAction::Retry,
            next_instruction,
            reason,
        }
    }

    pub fn is_accept(&self) -> bool {
        self.action == FitAction::Accept
    }
}

/// Decides the next step after `attempt`. `history` holds the earlier attempts
/// of the same run, oldest first.
pub fn decide(
    attempt: &TailoringAttempt,
    history: &[TailoringAttempt],
    policy: &FitPolicy,
) -> Decision {
    if attempt.attempt_index >= policy.max_attempts {
        return Decision::accept(DecisionReason::AttemptCap);
    }

    if attempt.page_count > 1 {
        return Decision::retry(AdjustmentInstruction::Shorten, DecisionReason::PageOverflow);
    }

    let (instruction, reason) = match attempt.fill_ratio {
        None => return Decision::accept(DecisionReason::FillUnknown),
        Some(ratio) if ratio < policy.low => {
            (AdjustmentInstruction::Expand, DecisionReason::UnderFilled)
        }
        Some(ratio) if ratio > policy.high => {
            (AdjustmentInstruction::Shorten, DecisionReason::OverFilled)
        }
        Some(_) => return Decision::accept(DecisionReason::WithinTarget),
    };

    if last_adjustment(attempt, history).and_then(|last| last.opposite()) == Some(instruction) {
        return Decision::accept(DecisionReason::OscillationGuard);
    }

    Decision::retry(instruction, reason)
}

/// Most recent EXPAND / SHORTEN that shaped the run so far.
fn last_adjustment(
    attempt: &TailoringAttempt,
    history: &[TailoringAttempt],
) -> Option<AdjustmentInstruction> {
    std::iter::once(attempt)
        .chain(history.iter().rev())
        .map(|a| a.prompt_instruction)
        .find(|instruction| *instruction != AdjustmentInstruction::None)
}
