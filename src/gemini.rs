use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::ReferenceImage;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

const LOGGED_DATA_CHARS: usize = 50;

/// Shortens long inline `data` strings so request/response bodies stay readable in logs.
pub fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                match val {
                    serde_json::Value::String(s) if key == "data" => {
                        if let Some(short) = shorten_for_log(s) {
                            *s = short;
                        }
                    }
                    other => truncate_base64_in_json(other),
                }
            }
        }
        serde_json::Value::Array(arr) => arr.iter_mut().for_each(truncate_base64_in_json),
        _ => {}
    }
}

fn shorten_for_log(s: &str) -> Option<String> {
    let total = s.chars().count();
    if total <= LOGGED_DATA_CHARS * 2 {
        return None;
    }
    let (cut, _) = s.char_indices().nth(LOGGED_DATA_CHARS)?;
    Some(format!("{}...[truncated {} chars]", &s[..cut], total - LOGGED_DATA_CHARS))
}

/// One `generateContent` call: the prompt text first, then reference images in order.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub model: String,
    pub text: String,
    pub images: Vec<ReferenceImage>,
    pub response_modalities: &'static [&'static str],
}

impl ContentRequest {
    pub const IMAGE_AND_TEXT: &'static [&'static str] = &["TEXT", "IMAGE"];
    pub const TEXT_ONLY: &'static [&'static str] = &["TEXT"];

    pub fn to_body(&self) -> serde_json::Value {
        let mut parts = Vec::with_capacity(self.images.len() + 1);
        parts.push(json!({ "text": self.text }));
        parts.extend(self.images.iter().map(|img| {
            json!({ "inlineData": { "mimeType": img.mime_type, "data": img.base64() } })
        }));

        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseModalities": self.response_modalities,
                "candidateCount": 1
            }
        })
    }
}

/// The outbound model call. Production talks HTTP; tests and demo mode stub it.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_content(&self, request: &ContentRequest) -> Result<GeminiResponse, GeminiError>;

    fn is_demo(&self) -> bool {
        false
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate_content(&self, request: &ContentRequest) -> Result<GeminiResponse, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );

        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let request_body = request.to_body();
        let mut logged_body = request_body.clone();
        truncate_base64_in_json(&mut logged_body);
        info!(
            parts = request.images.len() + 1,
            "📤 Request body: {}",
            serde_json::to_string_pretty(&logged_body).unwrap_or_default()
        );

        let response = self.client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(GeminiError::Status { status: status.as_u16(), body: error_body });
        }

        let response_text = response.text().await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        // Truncate base64 image data for cleaner logging
        if let Ok(mut json_value) = serde_json::from_str::<serde_json::Value>(&response_text) {
            truncate_base64_in_json(&mut json_value);
            info!("📥 Raw Gemini API response: {}", json_value);
        }

        serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Decode(e.to_string()))
    }
}

/// Offline backend used when no API key is configured.
pub struct PlaceholderBackend;

impl PlaceholderBackend {
    pub fn placeholder_svg(prompt: &str) -> String {
        let colors = ["#F59E0B", "#3B82F6", "#10B981", "#8B5CF6", "#EF4444"];
        let color = colors[prompt.len() % colors.len()];
        let svg = format!(r#"<svg width="512" height="512" xmlns="http://www.w3.org/2000/svg">
            <defs>
                <linearGradient id="grad" x1="0%" y1="0%" x2="100%" y2="100%">
                    <stop offset="0%" style="stop-color:{color};stop-opacity:1" />
                    <stop offset="100%" style="stop-color:{color};stop-opacity:0.6" />
                </linearGradient>
            </defs>
            <rect width="512" height="512" fill="url(#grad)" />
            <text x="256" y="256" font-family="Arial, sans-serif" font-size="28" font-weight="bold"
                  text-anchor="middle" fill="white">Demo Mode</text>
            <text x="256" y="296" font-family="Arial, sans-serif" font-size="14"
                  text-anchor="middle" fill="white" opacity="0.8">Set GEMINI_API_KEY to generate real images</text>
        </svg>"#);
        base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
    }
}

#[async_trait]
impl GenerationBackend for PlaceholderBackend {
    async fn generate_content(&self, request: &ContentRequest) -> Result<GeminiResponse, GeminiError> {
        info!("Using demo mode - no real images generated");
        let part = if request.response_modalities.contains(&"IMAGE") {
            Part::Inline {
                inline_data: InlineData {
                    data: Self::placeholder_svg(&request.text),
                    mime_type: "image/svg+xml".to_string(),
                },
            }
        } else {
            Part::Text {
                text: "Demo suggestion: a lantern-lit street at dusk, slowly filling with the first snow of winter."
                    .to_string(),
            }
        };
        Ok(GeminiResponse {
            candidates: vec![Candidate { content: Content { parts: vec![part] } }],
        })
    }

    fn is_demo(&self) -> bool {
        true
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Part {
    Inline {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
    Text { text: String },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InlineData {
    #[serde(default)]
    pub data: String,
    #[serde(rename = "mimeType", alias = "mime_type", default)]
    pub mime_type: String,
}

/// What a single generation call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Image { mime_type: String, data: String },
    /// The model answered in words only, usually explaining why it made no image.
    TextOnly { text: String },
}

impl ParsedResponse {
    pub fn data_uri(mime_type: &str, data: &str) -> String {
        format!("data:{mime_type};base64,{data}")
    }
}

fn first_candidate_parts(resp: &GeminiResponse) -> Result<&[Part], GeminiError> {
    resp.candidates
        .first()
        .map(|c| c.content.parts.as_slice())
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| GeminiError::MalformedResponse("missing candidates or content".into()))
}

pub fn parse_generation_response(resp: &GeminiResponse) -> Result<ParsedResponse, GeminiError> {
    let parts = first_candidate_parts(resp)?;

    for p in parts {
        if let Part::Inline { inline_data } = p {
            if inline_data.data.is_empty() || inline_data.mime_type.is_empty() {
                return Err(GeminiError::MalformedResponse("invalid image data in response".into()));
            }
            info!("🎯 Found image data with mime type: {}", inline_data.mime_type);
            return Ok(ParsedResponse::Image {
                mime_type: inline_data.mime_type.clone(),
                data: inline_data.data.clone(),
            });
        }
    }

    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        })
        .collect();

    if texts.is_empty() {
        warn!("⚠️ Response carried neither image data nor text");
        return Err(GeminiError::MalformedResponse("no image or text content in response".into()));
    }

    info!("💬 Model replied with text only ({} parts)", texts.len());
    Ok(ParsedResponse::TextOnly { text: texts.join("\n") })
}

/// Every usable part in response order. Inline parts without data are skipped.
/// Every usable part of the first candidate, paired with its index in the reply.
pub fn parse_timeline_parts(resp: &GeminiResponse) -> Result<Vec<(usize, ParsedResponse)>, GeminiError> {
    let parts = first_candidate_parts(resp)?;
    Ok(parts
        .iter()
        .enumerate()
        .filter_map(|(index, p)| match p {
            Part::Text { text } if !text.is_empty() => Some((index, ParsedResponse::TextOnly { text: text.clone() })),
            Part::Inline { inline_data } if !inline_data.data.is_empty() && !inline_data.mime_type.is_empty() => Some((
                index,
                ParsedResponse::Image {
                    mime_type: inline_data.mime_type.clone(),
                    data: inline_data.data.clone(),
                },
            )),
            _ => None,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyValidation {
    pub valid: bool,
    pub message: String,
}

pub fn validate_api_key(api_key: Option<&str>) -> ApiKeyValidation {
    let (valid, message) = match api_key {
        None | Some("") => (false, "API Key not found"),
        Some(key) if key.len() < 10 => (false, "API Key too short (likely invalid)"),
        Some(key) if !key.starts_with("AIza") => (false, "API Key format invalid (should start with \"AIza\")"),
        Some(_) => (true, "API Key format appears valid"),
    };
    ApiKeyValidation { valid, message: message.to_string() }
}

pub fn mask_api_key(api_key: &str) -> String {
    if api_key.len() <= 10 || !api_key.is_ascii() {
        return "***".to_string();
    }
    format!("{}***{}", &api_key[..6], &api_key[api_key.len() - 4..])
}
