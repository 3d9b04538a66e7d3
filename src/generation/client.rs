use async_trait::async_trait;

use crate::artifact::ImageArtifact;

use super::request::GenerationRequest;
use super::GenerationResult;

/// The external generative-image capability.
///
/// Implementations make a single attempt per call: no retries, no caching.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Edits `source` as described by `request`, whose first part is `source` itself.
    async fn edit_image(
        &self,
        source: &ImageArtifact,
        request: &GenerationRequest,
    ) -> GenerationResult<ImageArtifact>;

    async fn generate_from_text(&self, prompt: &str) -> GenerationResult<ImageArtifact>;
}
