//! Relay router tests, driven in-process with `tower::ServiceExt::oneshot`

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bach_relay::server::{router, AppState};
use bach_relay::sse::SseRecord;
use bach_relay::upstream::{Part, UpstreamRole, IMAGE_PLACEHOLDER};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::mock_server::{envelope, records, FakeBackend};

const BODY_LIMIT: usize = 1024 * 1024;

fn app(backend: Arc<FakeBackend>) -> Router {
    router(AppState::new(backend, 5000), BODY_LIMIT)
}

async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn chat_streams_text_records_then_done() {
    let backend = FakeBackend::streaming(&["Hel", "lo", ", world"]).into_arc();
    let (status, body) = post_json(
        app(backend.clone()),
        "/api/chat",
        json!({ "message": "hi", "history": [] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let recs = records(&body);
    assert_eq!(recs.len(), 4);
    let texts: Vec<String> = recs[..3]
        .iter()
        .map(|r| envelope(r).text.unwrap())
        .collect();
    assert_eq!(texts, vec!["Hel", "lo", ", world"]);
    assert_eq!(recs[3], SseRecord::Done);
}

#[tokio::test]
async fn chat_response_is_an_event_stream() {
    let backend = FakeBackend::streaming(&["ok"]).into_arc();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "message": "hi" }).to_string()))
        .unwrap();
    let response = app(backend).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()[header::CONNECTION], "keep-alive");
}

#[tokio::test]
async fn upstream_failure_mid_stream_ends_with_error_record() {
    let backend = FakeBackend::failing_after(&["one ", "two"], "quota exceeded").into_arc();
    let (status, body) = post_json(app(backend), "/api/chat", json!({ "message": "hi" })).await;

    assert_eq!(status, StatusCode::OK);
    let recs = records(&body);
    assert_eq!(recs.len(), 3);
    assert_eq!(envelope(&recs[0]).text.as_deref(), Some("one "));
    assert_eq!(envelope(&recs[1]).text.as_deref(), Some("two"));
    assert_eq!(
        envelope(&recs[2]).error_message().as_deref(),
        Some("quota exceeded")
    );
    assert!(!recs.contains(&SseRecord::Done));
}

#[tokio::test]
async fn upstream_failure_before_first_chunk_is_a_single_error_record() {
    let backend = FakeBackend::failing_to_start("API key not valid").into_arc();
    let (status, body) = post_json(app(backend), "/api/chat", json!({ "message": "hi" })).await;

    assert_eq!(status, StatusCode::OK);
    let recs = records(&body);
    assert_eq!(recs.len(), 1);
    assert_eq!(
        envelope(&recs[0]).error_message().as_deref(),
        Some("API key not valid")
    );
}

#[tokio::test]
async fn empty_turn_is_rejected_without_calling_upstream() {
    let backend = FakeBackend::streaming(&["unused"]).into_arc();
    let (status, body) = post_json(
        app(backend.clone()),
        "/api/chat",
        json!({ "message": "", "attachments": [] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let recs = records(&body);
    assert_eq!(recs.len(), 1);
    assert!(envelope(&recs[0]).error_message().is_some());
    assert!(backend.chats().is_empty());
}

#[tokio::test]
async fn history_is_reconstructed_for_upstream() {
    let backend = FakeBackend::streaming(&["sure"]).into_arc();
    let (status, _) = post_json(
        app(backend.clone()),
        "/api/chat",
        json!({
            "message": "what is in this picture?",
            "attachments": [{ "mimeType": "image/png", "data": "iVBORw0KGgo=" }],
            "systemInstruction": "be terse",
            "history": [
                { "role": "user", "content": "draw a cat" },
                { "role": "model", "content": "", "generatedImage": "QUJD" },
                { "role": "model", "content": "" },
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let chats = backend.chats();
    assert_eq!(chats.len(), 1);
    let chat = &chats[0];

    assert_eq!(chat.system_instruction, "be terse");
    assert_eq!(chat.history.len(), 3);
    assert_eq!(chat.history[0].role, UpstreamRole::User);
    assert_eq!(chat.history[0].parts, vec![Part::text("draw a cat")]);
    assert_eq!(chat.history[1].role, UpstreamRole::Model);
    assert_eq!(chat.history[1].parts, vec![Part::text(IMAGE_PLACEHOLDER)]);
    assert_eq!(chat.history[2].parts.len(), 1);

    assert_eq!(
        chat.message,
        vec![
            Part::inline("image/png", "iVBORw0KGgo="),
            Part::text("what is in this picture?"),
        ]
    );
}

#[tokio::test]
async fn generate_image_returns_first_image() {
    let backend = FakeBackend::with_images(&["QUJD", "REVG"]).into_arc();
    let (status, body) = post_json(
        app(backend.clone()),
        "/api/generate-image",
        json!({ "prompt": "a lighthouse at dusk" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "imageBytes": "QUJD" }));
    assert_eq!(backend.prompts(), vec!["a lighthouse at dusk"]);
}

#[tokio::test]
async fn generate_image_with_no_images_is_a_server_error() {
    let backend = FakeBackend::with_images(&[]).into_arc();
    let (status, body) =
        post_json(app(backend), "/api/generate-image", json!({ "prompt": "x" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "No image generated" }));
}

#[tokio::test]
async fn generate_image_failure_reports_upstream_message() {
    let backend = FakeBackend::failing_images("safety filter triggered").into_arc();
    let (status, body) =
        post_json(app(backend), "/api/generate-image", json!({ "prompt": "x" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "safety filter triggered");
}

#[tokio::test]
async fn generate_image_blank_prompt_is_a_server_error() {
    let backend = FakeBackend::with_images(&["QUJD"]).into_arc();
    let (status, body) = post_json(
        app(backend.clone()),
        "/api/generate-image",
        json!({ "prompt": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "error": "prompt must not be empty" }));
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let backend = FakeBackend::streaming(&["unused"]).into_arc();
    let app = router(AppState::new(backend.clone(), 5000), 1024);
    let (status, _) = post_json(app, "/api/chat", json!({ "message": "x".repeat(4096) })).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(backend.chats().is_empty());
}

#[tokio::test]
async fn status_page_reports_port() {
    let backend = FakeBackend::default().into_arc();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app(backend).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Backend is Running!"));
    assert!(html.contains("Port: 5000"));
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let backend = FakeBackend::default().into_arc();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/chat")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app(backend).oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
