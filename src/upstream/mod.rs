//! # Upstream Module
//!
//! The relay's view of the external generative-AI service. Inference, history
//! handling and image synthesis all happen upstream; this module only shapes
//! requests and turns responses into plain text fragments.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`GenerativeBackend`] | Seam between the HTTP handlers and the upstream service |
//! | [`GeminiBackend`] | REST implementation for Gemini chat and Imagen |
//! | [`reconstruct_history`] | Relay history → upstream `{role, parts}` turns |

pub mod content;
pub mod gemini;
pub mod history;

pub use content::{
    Content, GeneratedImage, ImageGenerationConfig, InlineData, Part, UpstreamChat, UpstreamRole,
};
pub use gemini::GeminiBackend;
pub use history::{current_parts, reconstruct_history, FILLER_TEXT, IMAGE_PLACEHOLDER};

use crate::{BoxStream, Result};
use async_trait::async_trait;

/// A generative model reachable by the relay.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Open a chat seeded with `request.history` and the system instruction,
    /// send `request.message`, and stream back text fragments.
    ///
    /// Errors before the first fragment are returned directly; errors after
    /// that arrive as an `Err` item and end the stream.
    async fn stream_chat(&self, request: UpstreamChat) -> Result<BoxStream<'static, String>>;

    /// Generate images for `prompt`. An empty vector means the model produced none.
    async fn generate_images(
        &self,
        prompt: &str,
        config: &ImageGenerationConfig,
    ) -> Result<Vec<GeneratedImage>>;
}
