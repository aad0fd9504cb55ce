//! Conversation turns and their attachments

use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One message in a conversation.
///
/// Turns are append-only; the only in-place edit is appending streamed
/// deltas to the in-progress model turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// Base64 image produced by the image model for this turn.
    pub generated_image: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    pub is_error: bool,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into())
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text.into())
    }

    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            attachments: Vec::new(),
            generated_image: None,
            created_at_ms: now_ms(),
            is_error: false,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_generated_image(mut self, image: impl Into<String>) -> Self {
        self.generated_image = Some(image.into());
        self
    }

    /// True when the turn has no text, no attachments and no image.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
            && self.attachments.is_empty()
            && self.generated_image.is_none()
    }

    pub fn push_delta(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.content = message.into();
        self.is_error = true;
    }
}

/// Author of a turn.
///
/// Deserialization is lenient: `"user"` maps to [`Role::User`] and every other
/// value maps to [`Role::Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "user" { Role::User } else { Role::Model })
    }
}

/// Binary file data attached to a turn, carried as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    pub data: String,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mime_type = guess_media_type(path).ok_or_else(|| {
            crate::Error::validation(format!(
                "unsupported attachment type: {}",
                path.display()
            ))
        })?;
        Ok(Self::from_bytes(mime_type, &bytes))
    }
}

fn guess_media_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    let mt = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mt)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
