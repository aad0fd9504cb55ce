//! Upstream request model: role-tagged multi-part turns

use serde::{Deserialize, Serialize};

/// Role as understood by the upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamRole {
    User,
    Model,
}

/// One turn in upstream shape (`{role, parts}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: UpstreamRole,
    pub parts: Vec<Part>,
}

/// A text part or an inline binary part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::InlineData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Everything needed to open a chat session upstream and send one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamChat {
    pub history: Vec<Content>,
    pub system_instruction: String,
    /// Parts of the turn being sent: attachments first, text last.
    pub message: Vec<Part>,
}

/// Image generation request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenerationConfig {
    pub number_of_images: u32,
    pub output_mime_type: String,
    pub aspect_ratio: String,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            number_of_images: 1,
            output_mime_type: "image/jpeg".to_string(),
            aspect_ratio: "16:9".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Base64-encoded image.
    pub image_bytes: String,
}
