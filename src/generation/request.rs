use std::sync::Arc;

use crate::artifact::ImageArtifact;
use crate::geometry::Hotspot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    Image { mime: String, data: Arc<[u8]> },
    Text(String),
}

/// Ordered request parts: visual inputs first, one trailing text part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    parts: Vec<RequestPart>,
}

impl GenerationRequest {
    pub fn parts(&self) -> &[RequestPart] {
        &self.parts
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, RequestPart::Image { .. }))
            .count()
    }

    pub fn text(&self) -> Option<&str> {
        self.parts.iter().rev().find_map(|part| match part {
            RequestPart::Text(text) => Some(text.as_str()),
            RequestPart::Image { .. } => None,
        })
    }
}

fn image_part(artifact: &ImageArtifact) -> RequestPart {
    RequestPart::Image {
        mime: artifact.mime().to_string(),
        data: artifact.shared_bytes(),
    }
}

/// Assembles an edit request around the current image.
///
/// Hotspot and global tools are mutually exclusive; the session enforces that
/// before calling here.
pub fn build_edit_request(
    current: &ImageArtifact,
    system_instruction: &str,
    user_prompt: &str,
    hotspot: Option<Hotspot>,
    references: &[ImageArtifact],
) -> GenerationRequest {
    let mut parts = Vec::with_capacity(references.len() + 2);
    parts.push(image_part(current));
    parts.extend(references.iter().map(image_part));

    let mut text = system_instruction.to_string();
    if !user_prompt.is_empty() {
        text.push_str(&format!("\nUser Request: \"{user_prompt}\""));
    }
    if let Some(Hotspot { x, y }) = hotspot {
        text.push_str(&format!(
            "\nEdit Location: Focus on the area around pixel coordinates (x: {x}, y: {y})."
        ));
    }
    if !references.is_empty() {
        text.push('\n');
        text.push_str(&reference_directive(references.len()));
    }
    parts.push(RequestPart::Text(text));

    GenerationRequest { parts }
}

fn reference_directive(count: usize) -> String {
    let provided = if count == 1 {
        "An additional reference image has been provided.".to_string()
    } else {
        format!("{count} additional reference images have been provided.")
    };
    format!(
        "{provided} Use them as context for the edit. Whether they supply a style, an object, an outfit, or furniture must be inferred from the user's prompt."
    )
}

/// Prompt for text-to-image generation; no image, hotspot or references are involved.
pub fn build_text_to_image_prompt(
    system_instruction: &str,
    location: &str,
    style: Option<&str>,
) -> String {
    let mut prompt = format!("{system_instruction}\n\nLocation: \"{location}\"");
    if let Some(style) = style {
        prompt.push_str(&format!("\n\nStyle: \"{style}\""));
    }
    prompt
}
