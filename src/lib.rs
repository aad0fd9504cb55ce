//! # bach-relay
//!
//! Streaming chat relay for BACH AI.
//!
//! A small HTTP server holds the generative-AI credentials and relays chat
//! turns to the upstream model, streaming each reply back to the caller as
//! Server-Sent Events. The same crate ships the client side: an SSE consumer
//! that delivers text deltas as they arrive and can be cancelled at any point
//! without losing what was already received.
//!
//! ## Overview
//!
//! ```text
//!  ChatSession ──► RelayClient ──POST /api/chat──► server ──► GenerativeBackend
//!       ▲               │                            │              │
//!       └── on_chunk ◄──┘◄──── data: {"text": ..} ◄──┘◄─── deltas ──┘
//! ```
//!
//! - **Stateless relay**: every request carries its full history
//! - **Streaming-first**: deltas are forwarded as soon as upstream yields them
//! - **Cancellable**: one token per in-flight request, partial text is kept
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bach_relay::client::RelayClient;
//! use bach_relay::config::ClientConfig;
//! use bach_relay::session::ChatSession;
//! use bach_relay::types::ChatMode;
//!
//! #[tokio::main]
//! async fn main() -> bach_relay::Result<()> {
//!     let client = RelayClient::new(&ClientConfig::default())?;
//!     let mut session = ChatSession::new(ChatMode::Chat);
//!
//!     session
//!         .send(&client, "Explain SSE in one line", Vec::new(), |delta| {
//!             print!("{delta}")
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Turns, attachments, chat modes and wire records |
//! | [`sse`] | Incremental SSE decoding and relay-side encoding |
//! | [`upstream`] | History reconstruction and the Gemini backend |
//! | [`server`] | axum router for the chat and image endpoints |
//! | [`client`] | Cancellable streaming client for the relay |
//! | [`session`] | Client conversation state and mode switching |
//! | [`config`] | Environment-driven server and client settings |

pub mod client;
pub mod config;
pub mod server;
pub mod session;
pub mod sse;
pub mod types;
pub mod upstream;

pub use client::RelayClient;
pub use config::{ClientConfig, RelayConfig};
pub use session::{CancelHandle, ChatSession, SendOutcome};
pub use types::{Attachment, ChatMode, Role, Turn};
pub use upstream::{GeminiBackend, GenerativeBackend};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of fallible items.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, TransportError};
