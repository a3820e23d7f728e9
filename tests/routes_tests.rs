//! HTTP surface exercised through the router with a stub model behind it.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use chrono_banana::gemini::validate_api_key;
use chrono_banana::rate_limit::ManualClock;
use chrono_banana::routes::{router, AppState, MAX_STORED_RESULTS};
use common::*;

fn app_with(response: Value) -> (Router, Arc<StubBackend>, AppState) {
    let clock = ManualClock::default();
    let backend = StubBackend::new(clock.clone(), response);
    let generator = generator_with(backend.clone(), &clock);
    let state = AppState::new(Arc::new(generator), validate_api_key(Some("AIzaSyTestKey1234")));
    (router(state.clone()), backend, state)
}

fn gated_app() -> (Router, Arc<GatedBackend>) {
    let clock = ManualClock::default();
    let backend = GatedBackend::new(image_response());
    let generator = generator_with(backend.clone(), &clock);
    let state = AppState::new(Arc::new(generator), validate_api_key(Some("AIzaSyTestKey1234")));
    (router(state), backend)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        // Extractor rejections come back as plain text.
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn generate_returns_image_and_records_history() {
    let (app, backend, _) = app_with(image_response());

    let (status, body) = send(
        &app,
        "POST",
        "/api/generate",
        Some(json!({
            "prompt": "  a harbor at dawn  ",
            "time_control": { "mode": { "kind": "custom_future", "offset": 10 }, "unit": "minutes", "image_count": 3 },
            "aspect_ratio": "1:1",
            "images": [{ "name": "boat.png", "mime_type": "image/png", "data": "iVBORw0KGgo=" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["result"]["kind"], "image");
    assert_eq!(body["result"]["image_url"], "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==");
    assert_eq!(body["reference_image_count"], 2);
    assert_eq!(body["time_mode"], "Future (+10 minutes)");
    assert_eq!(
        body["final_prompt"],
        "a harbor at dawn\nGenerate 3 distinct, separate, independent images of this scene at the following intervals: time 0 (now), 5 minutes later, 10 minutes later. Maintain the aspect ratio of the last reference white blank image."
    );
    assert_eq!(backend.call_count(), 1);

    let (status, history) = send(&app, "GET", "/api/results", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let id = body["result"]["id"].as_str().unwrap();
    let (status, single) = send(&app, "GET", &format!("/api/results/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(single["id"], id);

    let (status, _) = send(&app, "DELETE", &format!("/api/results/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/results/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn text_only_reply_is_returned_as_text_result() {
    let (app, _, _) = app_with(text_response());

    let (status, body) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a forbidden scene" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["kind"], "text");
    assert_eq!(body["time_mode"], "Scene End");
}

#[tokio::test]
async fn malformed_reply_is_bad_gateway_and_keeps_history() {
    let (app, _, state) = app_with(empty_response());

    let (status, body) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a quiet field" }))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("Please try again"));
    assert!(state.results.read().is_empty());
}

#[tokio::test]
async fn validation_failures_are_bad_requests_without_dispatch() {
    let (app, backend, _) = app_with(image_response());

    for body in [
        json!({ "prompt": "   " }),
        json!({ "prompt": "a cat", "images": [{ "mime_type": "image/gif", "data": "R0lGODlh" }] }),
        json!({ "prompt": "a cat", "images": [{ "mime_type": "image/png", "data": "" }] }),
        json!({ "prompt": "a cat", "images": [{ "mime_type": "image/png", "data": "not base64!" }] }),
    ] {
        let (status, response) = send(&app, "POST", "/api/generate", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body} -> {response}");
        assert!(response["error"].is_string());
    }
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn unknown_aspect_ratio_is_rejected_at_parse_time() {
    let (app, backend, _) = app_with(image_response());

    let (status, _) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a cat", "aspect_ratio": "21:9" }))).await;

    assert!(status.is_client_error());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn preview_composes_without_dispatching() {
    let (app, backend, _) = app_with(image_response());

    let (status, body) = send(
        &app,
        "POST",
        "/api/prompt/preview",
        Some(json!({
            "prompt": "a city street",
            "time_control": { "mode": { "kind": "current_only" } },
            "aspect_ratio": "16:9"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["final_prompt"], "a city street Maintain the aspect ratio of the last reference white blank image.");
    assert_eq!(body["includes_aspect_ratio_image"], true);
    assert_eq!(body["reference_image_count"], 1);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn time_control_events_follow_the_state_machine() {
    let (app, _, _) = app_with(image_response());

    let (status, body) = send(
        &app,
        "POST",
        "/api/time-control",
        Some(json!({ "event": { "type": "set_current_only", "value": true } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "Current Only");
    assert_eq!(body["image_count_locked"], true);
    assert_eq!(body["state"]["image_count"], 1);

    let (_, body) = send(
        &app,
        "POST",
        "/api/time-control",
        Some(json!({ "state": body["state"], "event": { "type": "set_offset", "value": -10 } })),
    )
    .await;
    assert_eq!(body["label"], "Past (-10 minutes)");
    assert_eq!(body["offset"], -10.0);
    assert_eq!(body["image_count_locked"], false);
}

#[tokio::test]
async fn aspect_ratio_table_and_status_are_exposed() {
    let (app, _, _) = app_with(image_response());

    let (_, ratios) = send(&app, "GET", "/api/aspect-ratios", None).await;
    let ratios = ratios.as_array().unwrap();
    assert_eq!(ratios.len(), 6);
    assert_eq!(ratios[2]["ratio"], "16:9");
    assert_eq!(ratios[2]["width"], 1920);
    assert_eq!(ratios[2]["height"], 1080);

    let (_, status) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status["rate_limit"]["can_make_request"], true);
    assert_eq!(status["api_key"]["valid"], true);
    assert_eq!(status["demo_mode"], false);
    assert_eq!(status["generation_in_progress"], false);
}

#[tokio::test]
async fn suggestion_returns_model_text() {
    let (app, backend, _) = app_with(text_response());

    let (status, body) = send(
        &app,
        "POST",
        "/api/suggest",
        Some(json!({ "current_text": "close-up camera shot of a dancer", "mode": "auto" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "scene");
    assert_eq!(body["model"], "gemini-1.5-flash");
    assert!(backend.calls.lock()[0].1.text.contains("creating videos"));
}

#[tokio::test]
async fn second_generation_while_one_is_running_is_busy() {
    let (app, backend) = gated_app();

    let first = tokio::spawn({
        let app = app.clone();
        async move { send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a slow sunrise" }))).await }
    });
    backend.entered.notified().await;

    let (status, body) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a second scene" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "A generation is already in progress");

    let (status, timeline) = send(&app, "POST", "/api/timeline", Some(json!({ "prompt": "a second scene" }))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{timeline}");

    let (_, in_progress) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(in_progress["generation_in_progress"], true);

    backend.release.notify_one();
    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let (_, idle) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(idle["generation_in_progress"], false);

    backend.release.notify_one();
    let (status, _) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a third scene" }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn failed_generation_releases_the_guard() {
    let (app, backend, _) = app_with(empty_response());

    let (status, _) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a quiet field" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let (status, _) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": "a quiet field" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn history_is_capped_and_newest_first() {
    let (app, _, _) = app_with(image_response());

    let mut ids = Vec::new();
    for n in 0..=MAX_STORED_RESULTS {
        let (status, body) = send(&app, "POST", "/api/generate", Some(json!({ "prompt": format!("scene {n}") }))).await;
        assert_eq!(status, StatusCode::OK);
        ids.push(body["result"]["id"].as_str().unwrap().to_string());
    }

    let (_, history) = send(&app, "GET", "/api/results", None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), MAX_STORED_RESULTS);
    assert_eq!(history[0]["id"], ids[MAX_STORED_RESULTS].as_str());
    assert_eq!(history[0]["prompt"], format!("scene {MAX_STORED_RESULTS}"));
    assert_eq!(history[MAX_STORED_RESULTS - 1]["id"], ids[1].as_str());

    let (status, _) = send(&app, "GET", &format!("/api/results/{}", ids[0]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
