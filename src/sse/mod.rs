//! # SSE Module
//!
//! Server-Sent Events framing used on both sides of the relay: the client
//! decodes the relay's chat stream with it, and the Gemini backend decodes the
//! upstream `alt=sse` stream with the same decoder.
//!
//! ```text
//! network reads → SseDecoder (buffer, split on blank line) → SseRecord::{Data, Done}
//! ```

pub mod decode;
pub mod encode;

pub use decode::{decode_stream, SseDecoder, SseRecord};
pub use encode::{encode_envelope, encode_stream_body, DONE_RECORD};
