//! Scoped display resources for whichever artifact is currently shown.

use image::RgbaImage;
use thiserror::Error;
use uuid::Uuid;

use crate::artifact::ImageArtifact;

/// Something that can turn an artifact into a renderable handle and give it back.
pub trait DisplaySurface {
    type Handle;
    type Error;

    fn acquire(&mut self, artifact: &ImageArtifact) -> Result<Self::Handle, Self::Error>;
    fn release(&mut self, handle: Self::Handle);
}

/// Holds the handle for the artifact on screen and nothing else.
///
/// A handle is released as soon as its artifact stops being current, and on drop.
pub struct DisplayBinding<S: DisplaySurface> {
    surface: S,
    bound: Option<(Uuid, S::Handle)>,
}

impl<S: DisplaySurface> DisplayBinding<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            bound: None,
        }
    }

    pub fn bound_id(&self) -> Option<Uuid> {
        self.bound.as_ref().map(|(id, _)| *id)
    }

    pub fn handle(&self) -> Option<&S::Handle> {
        self.bound.as_ref().map(|(_, handle)| handle)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Brings the binding in line with `current`.
    ///
    /// On an acquire failure the previous handle is already released and nothing is bound.
    pub fn sync(&mut self, current: Option<&ImageArtifact>) -> Result<(), S::Error> {
        if self.bound_id() == current.map(ImageArtifact::id) {
            return Ok(());
        }
        self.unbind();
        if let Some(artifact) = current {
            let handle = self.surface.acquire(artifact)?;
            tracing::debug!(id = %artifact.id(), name = %artifact.name(), "display handle acquired");
            self.bound = Some((artifact.id(), handle));
        }
        Ok(())
    }

    fn unbind(&mut self) {
        if let Some((id, handle)) = self.bound.take() {
            tracing::debug!(%id, "display handle released");
            self.surface.release(handle);
        }
    }
}

impl<S: DisplaySurface> Drop for DisplayBinding<S> {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[derive(Debug, Error)]
#[error("failed to decode {name} for display: {source}")]
pub struct DecodeError {
    name: String,
    #[source]
    source: image::ImageError,
}

/// Decodes artifacts into RGBA pixel buffers, tracking how many are live.
#[derive(Debug, Default)]
pub struct DecodedSurface {
    live: usize,
}

impl DecodedSurface {
    pub fn live_handles(&self) -> usize {
        self.live
    }
}

impl DisplaySurface for DecodedSurface {
    type Handle = RgbaImage;
    type Error = DecodeError;

    fn acquire(&mut self, artifact: &ImageArtifact) -> Result<RgbaImage, DecodeError> {
        let decoded = match artifact.image_format() {
            Some(format) => image::load_from_memory_with_format(artifact.bytes(), format),
            None => image::load_from_memory(artifact.bytes()),
        }
        .map_err(|source| DecodeError {
            name: artifact.name().to_string(),
            source,
        })?;
        self.live += 1;
        Ok(decoded.to_rgba8())
    }

    fn release(&mut self, handle: RgbaImage) {
        drop(handle);
        self.live = self.live.saturating_sub(1);
    }
}
