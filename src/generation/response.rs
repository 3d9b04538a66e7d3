use crate::artifact::{decode_base64, ImageArtifact, DEFAULT_MIME};

use super::wire::{GenerateContentResponse, PredictResponse};
use super::{GenerationError, GenerationResult};

const NORMAL_FINISH_REASON: &str = "STOP";

/// Classifies an edit response. The checks run in priority order and the first
/// match wins: block reason, image part, abnormal finish reason, text-only reply.
pub fn interpret_edit_response(
    response: &GenerateContentResponse,
    context: &str,
) -> GenerationResult<ImageArtifact> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            tracing::error!(context, reason, "generation request was blocked");
            return Err(GenerationError::RequestBlocked {
                reason: reason.clone(),
                detail: feedback.block_reason_message.clone(),
            });
        }
    }

    let candidate = response.candidates.first();
    let parts = candidate
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or_default();

    if let Some(inline) = parts.iter().find_map(|part| part.inline_data.as_ref()) {
        let bytes = decode_base64(&inline.data)?;
        tracing::info!(context, mime = %inline.mime_type, bytes = bytes.len(), "received image data");
        return Ok(ImageArtifact::generated("edited", inline.mime_type.clone(), bytes));
    }

    if let Some(reason) = candidate.and_then(|candidate| candidate.finish_reason.as_deref()) {
        if reason != NORMAL_FINISH_REASON {
            tracing::error!(context, reason, "image generation stopped unexpectedly");
            return Err(GenerationError::GenerationHalted {
                reason: reason.to_string(),
            });
        }
    }

    let text = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<String>();
    let text = text.trim();
    tracing::error!(context, has_text = !text.is_empty(), "response did not contain an image part");
    Err(GenerationError::NoImageReturned {
        text_feedback: (!text.is_empty()).then(|| text.to_string()),
    })
}

pub fn interpret_text_to_image_response(
    response: &PredictResponse,
) -> GenerationResult<ImageArtifact> {
    let Some((payload, mime)) = response.predictions.iter().find_map(|prediction| {
        prediction
            .bytes_base64_encoded
            .as_deref()
            .map(|payload| (payload, prediction.mime_type.as_deref()))
    }) else {
        tracing::error!("text-to-image response contained no images");
        return Err(GenerationError::NoImageReturned {
            text_feedback: None,
        });
    };

    let bytes = decode_base64(payload)?;
    let mime = mime.unwrap_or(DEFAULT_MIME);
    tracing::info!(mime, bytes = bytes.len(), "received generated image");
    Ok(ImageArtifact::generated("generated", mime, bytes))
}
