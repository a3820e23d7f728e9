use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aspect_ratio::AspectRatioError;
use crate::gemini::{
    parse_generation_response, parse_timeline_parts, ContentRequest, GeminiError, GenerationBackend, ParsedResponse,
};
use crate::models::{
    ContentPart, GenerationPayload, GenerationResult, ReferenceImage, TimelineResponse, ACCEPTED_MIME_TYPES,
};
use crate::rate_limit::{Clock, RateLimitStatus, RateLimiter};

pub const MAX_PROMPT_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),
    #[error("Malformed response from the image model: {0}")]
    MalformedResponse(String),
    #[error("Could not prepare the aspect-ratio reference image: {0}")]
    ImageSynthesis(#[from] AspectRatioError),
    #[error("Image model request failed: {0}")]
    Upstream(GeminiError),
}

impl From<GeminiError> for GenerationError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::MalformedResponse(msg) => GenerationError::MalformedResponse(msg),
            other => GenerationError::Upstream(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub images: Vec<ReferenceImage>,
}

pub fn validate_prompt(prompt: &str) -> Result<(), GenerationError> {
    if prompt.trim().is_empty() {
        return Err(GenerationError::Validation("Prompt cannot be empty".into()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(GenerationError::Validation(format!(
            "Prompt too long (max {MAX_PROMPT_CHARS} characters)"
        )));
    }
    Ok(())
}

pub fn validate_images(images: &[ReferenceImage]) -> Result<(), GenerationError> {
    for image in images {
        if image.data.is_empty() || image.mime_type.is_empty() {
            return Err(GenerationError::Validation("Each image must have data and mimeType".into()));
        }
        if !ACCEPTED_MIME_TYPES.contains(&image.mime_type.as_str()) {
            return Err(GenerationError::Validation(format!(
                "Unsupported image type: {}",
                image.mime_type
            )));
        }
    }
    Ok(())
}

/// Dispatches generation calls one at a time, spaced by the rate limiter.
pub struct ImageGenerator {
    backend: Arc<dyn GenerationBackend>,
    limiter: RateLimiter,
    image_model: String,
    text_model: String,
}

impl ImageGenerator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        clock: Arc<dyn Clock>,
        delay: Duration,
        image_model: String,
        text_model: String,
    ) -> Self {
        Self {
            backend,
            limiter: RateLimiter::new(delay, clock),
            image_model,
            text_model,
        }
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn is_demo(&self) -> bool {
        self.backend.is_demo()
    }

    pub fn rate_limit_status(&self) -> RateLimitStatus {
        self.limiter.status()
    }

    async fn dispatch(&self, request: ContentRequest) -> Result<(crate::gemini::GeminiResponse, u64), GenerationError> {
        self.limiter.acquire().await;
        let started = Instant::now();
        info!(model = %request.model, images = request.images.len(), "🚀 Dispatching generation request");

        let response = self.backend.generate_content(&request).await.map_err(|e| {
            error!("❌ Generation request failed: {}", e);
            GenerationError::from(e)
        })?;
        Ok((response, started.elapsed().as_millis() as u64))
    }

    /// Single image generation. A text-only reply is returned as
    /// [`GenerationPayload::Text`], not as an error.
    pub async fn generate(&self, request: ImageRequest) -> Result<GenerationResult, GenerationError> {
        validate_prompt(&request.prompt)?;
        validate_images(&request.images)?;

        let model = request.model.unwrap_or_else(|| self.image_model.clone());
        let (response, processing_time_ms) = self
            .dispatch(ContentRequest {
                model: model.clone(),
                text: request.prompt.clone(),
                images: request.images,
                response_modalities: ContentRequest::IMAGE_AND_TEXT,
            })
            .await?;

        let payload = match parse_generation_response(&response)? {
            ParsedResponse::Image { mime_type, data } => {
                info!("✅ Image generated ({}, {} base64 chars)", mime_type, data.len());
                GenerationPayload::Image { image_url: ParsedResponse::data_uri(&mime_type, &data), mime_type }
            }
            ParsedResponse::TextOnly { text } => {
                warn!("💬 Model returned text instead of an image");
                GenerationPayload::Text { text }
            }
        };

        Ok(GenerationResult {
            id: Uuid::new_v4(),
            payload,
            prompt: request.prompt,
            model,
            created_at: Utc::now(),
            processing_time_ms,
        })
    }

    /// Mixed text/image generation, keeping every part in response order.
    pub async fn generate_timeline(&self, request: ImageRequest) -> Result<TimelineResponse, GenerationError> {
        validate_prompt(&request.prompt)?;
        validate_images(&request.images)?;

        let model = request.model.unwrap_or_else(|| self.image_model.clone());
        let (response, processing_time_ms) = self
            .dispatch(ContentRequest {
                model: model.clone(),
                text: request.prompt.clone(),
                images: request.images,
                response_modalities: ContentRequest::IMAGE_AND_TEXT,
            })
            .await?;

        let created_at = Utc::now();
        let parts: Vec<ContentPart> = parse_timeline_parts(&response)?
            .into_iter()
            .map(|(order, part)| {
                let timestamp = created_at + chrono::Duration::seconds(order as i64);
                match part {
                    ParsedResponse::TextOnly { text } => ContentPart::Text { content: text, order, timestamp },
                    ParsedResponse::Image { mime_type, data } => ContentPart::Image {
                        content: ParsedResponse::data_uri(&mime_type, &data),
                        order,
                        timestamp,
                    },
                }
            })
            .collect();

        if parts.is_empty() {
            return Err(GenerationError::MalformedResponse("no usable parts in response".into()));
        }

        let image_parts = parts.iter().filter(|p| matches!(p, ContentPart::Image { .. })).count();
        info!("✅ Timeline generated with {} parts ({} images)", parts.len(), image_parts);

        Ok(TimelineResponse {
            id: Uuid::new_v4(),
            text_parts: parts.len() - image_parts,
            image_parts,
            parts,
            prompt: request.prompt,
            model,
            created_at,
            processing_time_ms,
        })
    }

    /// Text-model call used for suggestions. Images are context only.
    pub async fn generate_text(&self, prompt: String, images: Vec<ReferenceImage>) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::Validation("Prompt cannot be empty".into()));
        }
        validate_images(&images)?;

        let (response, _) = self
            .dispatch(ContentRequest {
                model: self.text_model.clone(),
                text: prompt,
                images,
                response_modalities: ContentRequest::TEXT_ONLY,
            })
            .await?;

        match parse_generation_response(&response)? {
            ParsedResponse::TextOnly { text } => Ok(text),
            ParsedResponse::Image { .. } => Err(GenerationError::MalformedResponse(
                "expected text but received an image".into(),
            )),
        }
    }
}
