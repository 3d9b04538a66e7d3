use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::artifact::{encode_base64, ImageArtifact, DEFAULT_MIME};

use super::client::GenerationBackend;
use super::request::{GenerationRequest, RequestPart};
use super::response::{interpret_edit_response, interpret_text_to_image_response};
use super::wire::{
    Content, GenerateContentRequest, GenerateContentResponse, Part, PredictInstance,
    PredictParameters, PredictRequest, PredictResponse,
};
use super::{GenerationError, GenerationResult};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    pub base_url: String,
    pub edit_model: String,
    pub image_model: String,
}

/// HTTP client for the Gemini image-edit and Imagen text-to-image endpoints.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    edit_model: String,
    image_model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("edit_model", &self.edit_model)
            .field("image_model", &self.image_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            edit_model: settings.edit_model.clone(),
            image_model: settings.image_model.clone(),
        }
    }

    /// Reads the API key from the first non-empty variable in `env_vars`.
    pub fn from_env(settings: &GeminiSettings, env_vars: &[&str]) -> GenerationResult<Self> {
        let api_key = env_vars
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey {
                env: env_vars.join(" or "),
            })?;
        Ok(Self::new(settings, api_key))
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{model}:{method}", self.base_url)
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> GenerationResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, url, "generation service returned an error status");
            return Err(GenerationError::Api { status, body });
        }

        Ok(response.json::<R>().await?)
    }
}

pub(crate) fn to_wire_parts(request: &GenerationRequest) -> Vec<Part> {
    request
        .parts()
        .iter()
        .map(|part| match part {
            RequestPart::Image { mime, data } => Part::inline(mime.clone(), encode_base64(data)),
            RequestPart::Text(text) => Part::text(text.clone()),
        })
        .collect()
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn edit_image(
        &self,
        source: &ImageArtifact,
        request: &GenerationRequest,
    ) -> GenerationResult<ImageArtifact> {
        tracing::info!(
            model = %self.edit_model,
            source = %source.name(),
            images = request.image_count(),
            "sending image(s) and prompt to the model"
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: to_wire_parts(request),
            }],
        };
        let url = self.endpoint(&self.edit_model, "generateContent");
        let response: GenerateContentResponse = self.post_json(&url, &body).await?;
        interpret_edit_response(&response, "edit")
    }

    async fn generate_from_text(&self, prompt: &str) -> GenerationResult<ImageArtifact> {
        tracing::info!(model = %self.image_model, "requesting text-to-image generation");
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                output_mime_type: DEFAULT_MIME.to_string(),
            },
        };
        let url = self.endpoint(&self.image_model, "predict");
        let response: PredictResponse = self.post_json(&url, &body).await?;
        interpret_text_to_image_response(&response)
    }
}
