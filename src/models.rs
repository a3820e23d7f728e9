use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use base64::Engine;

use crate::aspect_ratio::AspectRatio;
use crate::time_control::TimeControl;

pub const ACCEPTED_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Uploaded,
    AspectRatioBlank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub name: Option<String>,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub source: ImageSource,
}

impl ReferenceImage {
    pub fn uploaded(name: Option<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name, mime_type: mime_type.into(), data, source: ImageSource::Uploaded }
    }

    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// A reference image as the browser uploads it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadedImage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    /// Base64, without a `data:` prefix.
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub time_control: TimeControl,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub images: Vec<UploadedImage>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationPayload {
    Image { image_url: String, mime_type: String },
    Text { text: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationResult {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: GenerationPayload,
    pub prompt: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
}

impl GenerationResult {
    pub fn is_text_only(&self) -> bool {
        matches!(self.payload, GenerationPayload::Text { .. })
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct GenerateResponse {
    pub result: GenerationResult,
    pub final_prompt: String,
    pub time_mode: String,
    pub reference_image_count: usize,
}

#[derive(Debug, Serialize, Clone)]
pub struct PromptPreview {
    pub final_prompt: String,
    pub time_mode: String,
    pub reference_image_count: usize,
    pub includes_aspect_ratio_image: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { content: String, order: usize, timestamp: DateTime<Utc> },
    Image { content: String, order: usize, timestamp: DateTime<Utc> },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimelineResponse {
    pub id: Uuid,
    pub parts: Vec<ContentPart>,
    pub prompt: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub text_parts: usize,
    pub image_parts: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeControlRequest {
    #[serde(default)]
    pub state: TimeControl,
    pub event: crate::time_control::TimeControlEvent,
}

#[derive(Debug, Serialize, Clone)]
pub struct TimeControlResponse {
    pub state: TimeControl,
    pub label: String,
    pub offset: f64,
    pub image_count_locked: bool,
}

impl From<TimeControl> for TimeControlResponse {
    fn from(state: TimeControl) -> Self {
        Self {
            label: state.label(),
            offset: state.offset(),
            image_count_locked: state.is_image_count_locked(),
            state,
        }
    }
}
