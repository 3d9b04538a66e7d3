//! The edit session: history, readiness rules, in-flight tracking and crop.

mod controller;
mod crop;
mod error;
mod retention;

pub use controller::{CompletedGeneration, EditSession, GenerationOutcome, PendingGeneration};
pub use crop::{centered_aspect_selection, crop_artifact, CropError, CropPreset, CropResult, CropTool};
pub use error::{SelectionIssue, SessionError, SessionResult};
pub use retention::{PromptRetention, PromptRetentionPolicy, RetentionRule};
