// Page-fit estimation for generated resumes.
// Compiled measurements come from the compiler module; the text heuristic is
// CPU-bound and is run through tokio::task::spawn_blocking by the orchestrator.

pub mod font_metrics;
pub mod page_fill;
pub mod text_layout;

pub use page_fill::{FitMethod, PageFit, PageFitEstimator};
