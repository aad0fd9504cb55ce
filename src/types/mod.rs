//! # Types Module
//!
//! Core data model shared by the relay server and its client.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Turn`] | One message in a conversation, authored by user or model |
//! | [`Role`] | `user` or `model` |
//! | [`Attachment`] | Base64 file payload with a MIME type |
//! | [`ChatMode`] | Operating mode selecting the system instruction |
//! | [`ChatRequest`] | Body of `POST /api/chat` |
//! | [`StreamEnvelope`] | JSON payload of one SSE data record |
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`turn`] | Turns, roles and attachments |
//! | [`mode`] | Operating modes |
//! | [`wire`] | Relay HTTP bodies |
//!
//! ## Example
//!
//! ```rust
//! use bach_relay::types::{Attachment, HistoryTurn, Turn};
//!
//! let turn = Turn::user("what is in this picture?")
//!     .with_attachments(vec![Attachment::from_bytes("image/png", b"\x89PNG")]);
//! let wire = HistoryTurn::from(&turn);
//! assert_eq!(wire.attachments.len(), 1);
//! ```

pub mod mode;
pub mod turn;
pub mod wire;

pub use mode::ChatMode;
pub use turn::{Attachment, Role, Turn};
pub use wire::{ChatRequest, ErrorBody, HistoryTurn, ImageRequest, ImageResponse, StreamEnvelope};
