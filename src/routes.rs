use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    aspect_ratio::{AspectRatio, AspectRatioConfig},
    error::AppError,
    gemini::ApiKeyValidation,
    models::{
        GenerateRequest, GenerateResponse, GenerationResult, PromptPreview, ReferenceImage, TimeControlRequest,
        TimeControlResponse, TimelineResponse, UploadedImage,
    },
    orchestrator::{GenerationError, ImageGenerator, ImageRequest},
    prompt::{self, ComposedPrompt},
    rate_limit::RateLimitStatus,
    suggestion::{self, Suggestion, SuggestionRequest},
};

pub const MAX_STORED_RESULTS: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ImageGenerator>,
    /// Newest first.
    pub results: Arc<RwLock<Vec<GenerationResult>>>,
    pub api_key: ApiKeyValidation,
    in_flight: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(generator: Arc<ImageGenerator>, api_key: ApiKeyValidation) -> Self {
        Self {
            generator,
            results: Arc::default(),
            api_key,
            in_flight: Arc::default(),
        }
    }

    fn begin_generation(&self) -> Result<InFlight, AppError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::Busy)?;
        Ok(InFlight(self.in_flight.clone()))
    }

    fn record(&self, result: GenerationResult) {
        let mut results = self.results.write();
        results.insert(0, result);
        results.truncate(MAX_STORED_RESULTS);
    }
}

struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/timeline", post(generate_timeline))
        .route("/api/prompt/preview", post(preview_prompt))
        .route("/api/time-control", post(apply_time_control))
        .route("/api/aspect-ratios", get(list_aspect_ratios))
        .route("/api/results", get(list_results))
        .route("/api/results/:id", get(get_result).delete(delete_result))
        .route("/api/suggest", post(suggest))
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

fn decode_uploads(images: &[UploadedImage]) -> Result<Vec<ReferenceImage>, AppError> {
    images
        .iter()
        .map(|img| {
            // Tolerate a full data URL from the browser.
            let raw = img.data.split_once(";base64,").map_or(img.data.as_str(), |(_, b64)| b64);
            let data = base64::engine::general_purpose::STANDARD
                .decode(raw.trim())
                .map_err(|_| AppError::Validation("Image data is not valid base64".into()))?;
            Ok(ReferenceImage::uploaded(img.name.clone(), img.mime_type.clone(), data))
        })
        .collect()
}

fn compose_request(body: &GenerateRequest) -> Result<ComposedPrompt, AppError> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt cannot be empty".into()));
    }
    let uploads = decode_uploads(&body.images)?;
    prompt::assemble(&body.prompt, &body.time_control, body.aspect_ratio, uploads)
        .map_err(|e| AppError::Generation(GenerationError::from(e)))
}

pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let _in_flight = state.begin_generation()?;
    let composed = compose_request(&body)?;
    let reference_image_count = composed.images.len();

    tracing::info!(
        "🚀 Generating for mode '{}' with {} reference image(s)",
        body.time_control.label(),
        reference_image_count
    );

    let result = state
        .generator
        .generate(ImageRequest {
            prompt: composed.text.clone(),
            model: body.model.clone(),
            images: composed.images,
        })
        .await?;

    state.record(result.clone());
    tracing::info!("✅ Stored result {} (text only: {})", result.id, result.is_text_only());

    Ok(Json(GenerateResponse {
        result,
        final_prompt: composed.text,
        time_mode: body.time_control.label(),
        reference_image_count,
    }))
}

pub async fn generate_timeline(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<TimelineResponse>, AppError> {
    let _in_flight = state.begin_generation()?;
    let composed = compose_request(&body)?;

    let timeline = state
        .generator
        .generate_timeline(ImageRequest {
            prompt: composed.text,
            model: body.model.clone(),
            images: composed.images,
        })
        .await?;
    Ok(Json(timeline))
}

pub async fn preview_prompt(Json(body): Json<GenerateRequest>) -> Result<Json<PromptPreview>, AppError> {
    let composed = compose_request(&body)?;
    Ok(Json(PromptPreview {
        includes_aspect_ratio_image: composed.has_blank_image(),
        reference_image_count: composed.images.len(),
        final_prompt: composed.text,
        time_mode: body.time_control.label(),
    }))
}

pub async fn apply_time_control(Json(body): Json<TimeControlRequest>) -> Json<TimeControlResponse> {
    Json(body.state.apply(body.event).into())
}

pub async fn list_aspect_ratios() -> Json<Vec<AspectRatioConfig>> {
    Json(AspectRatio::ALL.into_iter().map(AspectRatio::config).collect())
}

pub async fn list_results(State(state): State<AppState>) -> Json<Vec<GenerationResult>> {
    Json(state.results.read().clone())
}

pub async fn get_result(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<GenerationResult>, AppError> {
    state
        .results
        .read()
        .iter()
        .find(|r| r.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("result {id}")))
}

pub async fn delete_result(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let mut results = state.results.write();
    let before = results.len();
    results.retain(|r| r.id != id);
    if results.len() == before {
        return Err(AppError::NotFound(format!("result {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn suggest(
    State(state): State<AppState>,
    Json(body): Json<SuggestionRequest>,
) -> Result<Json<Suggestion>, AppError> {
    let images = decode_uploads(&body.images)?;
    let suggestion = suggestion::suggest(&state.generator, &body.current_text, images, body.mode).await?;
    Ok(Json(suggestion))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub rate_limit: RateLimitStatus,
    pub api_key: ApiKeyValidation,
    pub demo_mode: bool,
    pub image_model: String,
    pub text_model: String,
    pub generation_in_progress: bool,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        rate_limit: state.generator.rate_limit_status(),
        api_key: state.api_key.clone(),
        demo_mode: state.generator.is_demo(),
        image_model: state.generator.image_model().to_string(),
        text_model: state.generator.text_model().to_string(),
        generation_in_progress: state.in_flight.load(Ordering::Acquire),
    })
}
