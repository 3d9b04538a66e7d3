//! Requests to, and responses from, the external generative-image service.

mod client;
mod gemini;
mod request;
mod response;
mod wire;

use thiserror::Error;

use crate::artifact::DataUrlError;

pub use client::GenerationBackend;
pub use gemini::{GeminiClient, GeminiSettings, DEFAULT_API_BASE_URL};
pub use request::{
    build_edit_request, build_text_to_image_prompt, GenerationRequest, RequestPart,
};
pub use response::{interpret_edit_response, interpret_text_to_image_response};
pub use wire::{
    Candidate, Content, GenerateContentResponse, InlineData, Part, Prediction, PredictResponse,
    PromptFeedback,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The service refused the request before generating anything.
    #[error("Request was blocked. Reason: {reason}. {}", .detail.as_deref().unwrap_or_default())]
    RequestBlocked {
        reason: String,
        detail: Option<String>,
    },
    /// Generation started but stopped before producing an image.
    #[error("Image generation stopped unexpectedly. Reason: {reason}. This often relates to safety settings.")]
    GenerationHalted { reason: String },
    #[error("{}", no_image_message(.text_feedback.as_deref()))]
    NoImageReturned { text_feedback: Option<String> },
    #[error("the service returned an unreadable image: {0}")]
    MalformedDataUrl(#[from] DataUrlError),
    #[error("no API key found in environment variable {env}")]
    MissingApiKey { env: String },
    #[error("request to the generation service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation service responded with status {status}: {body}")]
    Api { status: u16, body: String },
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

fn no_image_message(text_feedback: Option<&str>) -> String {
    match text_feedback {
        Some(text) => format!("The AI model did not return an image. The model responded with text: \"{text}\""),
        None => "The AI model did not return an image. This can happen due to safety filters or if the request is too complex. Please try rephrasing your prompt to be more direct.".to_string(),
    }
}
