#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

use chrono_banana::gemini::{ContentRequest, GeminiError, GeminiResponse, GenerationBackend};
use chrono_banana::orchestrator::ImageGenerator;
use chrono_banana::rate_limit::{Clock, ManualClock, DEFAULT_DISPATCH_DELAY};

/// Canned backend that records each call and the (manual) time it arrived.
pub struct StubBackend {
    clock: ManualClock,
    response: Value,
    pub calls: Mutex<Vec<(Instant, ContentRequest)>>,
}

impl StubBackend {
    pub fn new(clock: ManualClock, response: Value) -> Arc<Self> {
        Arc::new(Self { clock, response, calls: Mutex::new(Vec::new()) })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn generate_content(&self, request: &ContentRequest) -> Result<GeminiResponse, GeminiError> {
        self.calls.lock().push((self.clock.now(), request.clone()));
        serde_json::from_value(self.response.clone()).map_err(|e| GeminiError::Decode(e.to_string()))
    }
}

/// Backend that parks every call until the test releases it.
pub struct GatedBackend {
    response: Value,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedBackend {
    pub fn new(response: Value) -> Arc<Self> {
        Arc::new(Self { response, entered: Notify::new(), release: Notify::new() })
    }
}

#[async_trait]
impl GenerationBackend for GatedBackend {
    async fn generate_content(&self, _request: &ContentRequest) -> Result<GeminiResponse, GeminiError> {
        self.entered.notify_one();
        self.release.notified().await;
        serde_json::from_value(self.response.clone()).map_err(|e| GeminiError::Decode(e.to_string()))
    }
}

pub fn image_response() -> Value {
    json!({
        "candidates": [{ "content": { "parts": [
            { "text": "Here is the harbor ten minutes later." },
            { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgoAAAANSUhEUg==" } }
        ]}}]
    })
}

pub fn text_response() -> Value {
    json!({
        "candidates": [{ "content": { "parts": [
            { "text": "I can't create an image of that, but I can describe it." }
        ]}}]
    })
}

pub fn empty_response() -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "executableCode": {} }] } }] })
}

pub fn generator_with(backend: Arc<dyn GenerationBackend>, clock: &ManualClock) -> ImageGenerator {
    ImageGenerator::new(
        backend,
        Arc::new(clock.clone()),
        DEFAULT_DISPATCH_DELAY,
        "gemini-2.5-flash-image-preview".to_string(),
        "gemini-1.5-flash".to_string(),
    )
}

pub fn seconds(n: u64) -> Duration {
    Duration::from_secs(n)
}
