//! Axum route handlers for the Tailoring API.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::tailoring::{AdjustmentType, AttemptSummary, TailoringResult};
use crate::state::AppState;
use crate::tailoring::artifacts::ArtifactError;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct TailorResponse {
    pub success: bool,
    pub original_filename: String,
    pub file_type: &'static str,
    pub tailored_resume: String,
    pub page_count: u32,
    /// Rounded to two decimals; null when the fill could not be measured.
    pub fill_ratio: Option<f64>,
    pub was_adjusted: bool,
    pub adjustment_count: u32,
    pub adjustment_type: AdjustmentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiled_pdf_url: Option<String>,
    pub attempts: Vec<AttemptSummary>,
}

impl From<TailoringResult> for TailorResponse {
    fn from(result: TailoringResult) -> Self {
        Self {
            success: true,
            original_filename: result.original_filename,
            file_type: result.file_format.file_type(),
            tailored_resume: result.final_text,
            page_count: result.page_count,
            fill_ratio: result.fill_ratio.map(round2),
            was_adjusted: result.was_adjusted,
            adjustment_count: result.adjustment_count,
            adjustment_type: result.adjustment_type,
            compiled_pdf_url: result.compiled_artifact.map(|a| a.url),
            attempts: result.attempts,
        }
    }
}

fn round2(value: f32) -> f64 {
    (f64::from(value) * 100.0).round() / 100.0
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /tailor
///
/// Runs the fit-adjustment loop for the loaded resume. Rejected with BUSY while
/// another run is in flight.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let result = state.tailor.tailor(&request.job_description).await?;
    Ok(Json(result.into()))
}

/// GET /compiled/:filename
pub async fn handle_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.artifacts.read(&filename).await.map_err(|e| match e {
        ArtifactError::InvalidName(_) | ArtifactError::NotFound(_) => {
            AppError::NotFound(format!("Compiled file {filename} not found"))
        }
        ArtifactError::Io(e) => AppError::Internal(e.into()),
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
