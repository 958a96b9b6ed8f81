//! Axum route handlers for resume upload and background context.

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::resume::ResumeDocument;
use crate::state::AppState;
use crate::store::upload::extract_resume;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub file_type: &'static str,
    pub preview: String,
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct CurrentResumeResponse {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
    /// When the resume was uploaded, or saved for a restored one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub context: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContextRequest {
    pub context: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /upload
///
/// Multipart upload with a single `file` field. The resume replaces the loaded
/// one immediately; a failed durable save is reported as `persisted: false`
/// rather than failing the upload.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    let extracted = extract_resume(&filename, bytes.to_vec())
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let document = ResumeDocument::new(
        extracted.source_text,
        extracted.source_format,
        extracted.filename,
    );
    let preview = document.preview();
    let filename = document.original_filename.clone();
    let file_type = document.source_format.file_type();

    let revision = state.store.load_resume(document).await;
    let persisted = match state.store.persist_resume(revision).await {
        Ok(persisted) => persisted,
        Err(e) => {
            warn!("Failed to persist uploaded resume: {e}");
            false
        }
    };
    info!(%filename, file_type, persisted, "resume uploaded");

    Ok(Json(UploadResponse {
        success: true,
        filename,
        file_type,
        preview,
        persisted,
    }))
}

/// GET /current-resume
pub async fn handle_current_resume(State(state): State<AppState>) -> Json<CurrentResumeResponse> {
    let response = match state.store.get_resume().await {
        Some(doc) => CurrentResumeResponse {
            loaded: true,
            filename: Some(doc.original_filename.clone()),
            file_type: Some(doc.source_format.file_type()),
            preview: Some(doc.preview()),
            persisted: Some(doc.persisted),
            loaded_at: Some(doc.loaded_at),
        },
        None => CurrentResumeResponse {
            loaded: false,
            filename: None,
            file_type: None,
            preview: None,
            persisted: None,
            loaded_at: None,
        },
    };
    Json(response)
}

/// GET /rag-context
pub async fn handle_get_context(State(state): State<AppState>) -> Json<ContextResponse> {
    Json(ContextResponse {
        context: state.store.get_context().await.text,
    })
}

/// POST /rag-context
pub async fn handle_update_context(
    State(state): State<AppState>,
    Json(req): Json<UpdateContextRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let saved = state.store.save_context(req.context).await?;
    info!(chars = saved.text.len(), "background context updated");
    Ok(Json(SuccessResponse { success: true }))
}
