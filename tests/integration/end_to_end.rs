//! Client and relay wired together over a real socket

use bach_relay::config::ClientConfig;
use bach_relay::server::{router, AppState};
use bach_relay::{Attachment, ChatMode, ChatSession, Error, RelayClient, SendOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::mock_server::FakeBackend;

async fn spawn_relay(backend: Arc<FakeBackend>) -> RelayClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(backend, addr.port()), 1024 * 1024);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    RelayClient::new(&ClientConfig::new(format!("http://{addr}/api"))).unwrap()
}

#[tokio::test]
async fn chat_round_trip() {
    let backend = FakeBackend::streaming(&["The answer ", "is ", "42."]).into_arc();
    let client = spawn_relay(backend.clone()).await;

    let mut session = ChatSession::new(ChatMode::Math);
    let mut printed = String::new();
    let outcome = session
        .send(&client, "what is six times seven?", Vec::new(), |d| {
            printed.push_str(d)
        })
        .await
        .unwrap();

    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(printed, "The answer is 42.");
    assert_eq!(session.history().last().unwrap().content, "The answer is 42.");

    let chats = backend.chats();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].system_instruction, ChatMode::Math.system_instruction());
    assert_eq!(chats[0].history.len(), 1);
}

#[tokio::test]
async fn upstream_error_surfaces_as_stream_error() {
    let backend = FakeBackend::failing_after(&["half "], "model overloaded").into_arc();
    let client = spawn_relay(backend).await;

    let mut received = String::new();
    let err = client
        .stream_message(&[], "hi", &[], "", |d| received.push_str(d), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(received, "half ");
    match err {
        Error::Stream { message } => assert_eq!(message, "model overloaded"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn cancel_while_upstream_is_silent_returns_partial() {
    let backend = FakeBackend::hanging_after(&["first"]).into_arc();
    let client = spawn_relay(backend).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let text = tokio::time::timeout(
        Duration::from_secs(5),
        client.stream_message(&[], "hi", &[], "", |_| {}, &cancel),
    )
    .await
    .expect("cancellation should end the call")
    .unwrap();
    assert_eq!(text, "first");
}

#[tokio::test]
async fn image_round_trip() {
    let backend = FakeBackend::with_images(&["QUJD"]).into_arc();
    let client = spawn_relay(backend.clone()).await;

    let image = client
        .generate_image("a lighthouse", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(image.as_deref(), Some("QUJD"));
    assert_eq!(backend.prompts(), vec!["a lighthouse"]);
}

#[tokio::test]
async fn image_mode_attachment_only_turn_fails_without_calling_backend() {
    let backend = FakeBackend::with_images(&["QUJD"]).into_arc();
    let client = spawn_relay(backend.clone()).await;

    let mut session = ChatSession::new(ChatMode::ImageGen);
    let attachment = Attachment::from_bytes("image/png", b"\x89PNG");
    let err = session
        .send(&client, "  ", vec![attachment], |_| {})
        .await
        .unwrap_err();

    match err {
        Error::Upstream { message } => assert_eq!(message, "prompt must not be empty"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.history().last().unwrap().is_error);
    assert!(backend.prompts().is_empty());
}
