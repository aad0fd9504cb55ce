//! # Relay Server
//!
//! Holds the upstream credentials and forwards chat and image requests.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | [`status::status_page`] |
//! | `POST /api/chat` | [`chat::chat`] (SSE) |
//! | `POST /api/generate-image` | [`image::generate_image`] |
//!
//! Requests share no mutable state: history arrives with every call and each
//! inbound connection drives at most one upstream call. When a client goes
//! away the response stream is dropped, which drops the upstream stream too.

pub mod chat;
pub mod image;
pub mod response;
pub mod status;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::RelayConfig;
use crate::upstream::GenerativeBackend;
use crate::Result;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn GenerativeBackend>,
    /// Port reported on the status page.
    pub port: u16,
}

impl AppState {
    pub fn new(backend: Arc<dyn GenerativeBackend>, port: u16) -> Self {
        Self { backend, port }
    }
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(status::status_page))
        .route("/api/chat", post(chat::chat))
        .route("/api/generate-image", post(image::generate_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &RelayConfig, backend: Arc<dyn GenerativeBackend>) -> Result<()> {
    let app = router(
        AppState::new(backend, config.port),
        config.body_limit_bytes(),
    );
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(
        text_model = %config.text_model,
        image_model = %config.image_model,
        "BACH AI relay listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down relay");
}
