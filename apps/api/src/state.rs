use std::sync::Arc;

use crate::store::ResumeStore;
use crate::tailoring::artifacts::ArtifactStore;
use crate::tailoring::Tailor;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main` and torn down after the server stops.
#[derive(Clone)]
pub struct AppState {
    /// The loaded resume and the background context.
    pub store: Arc<ResumeStore>,
    /// Fit-adjustment loop; reads `store`, never writes it.
    pub tailor: Arc<Tailor>,
    /// Published PDFs served by `GET /compiled/:filename`.
    pub artifacts: ArtifactStore,
}
