//! Operating modes and their system instructions

use std::fmt;
use std::str::FromStr;

/// Operating mode of a chat session. Selects the system instruction sent with
/// every chat request and whether a send goes to the image endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    Chat,
    Coding,
    Math,
    ImageGen,
}

impl ChatMode {
    pub const ALL: [ChatMode; 4] = [
        ChatMode::Chat,
        ChatMode::Coding,
        ChatMode::Math,
        ChatMode::ImageGen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Chat => "chat",
            ChatMode::Coding => "coding",
            ChatMode::Math => "math",
            ChatMode::ImageGen => "image",
        }
    }

    pub fn system_instruction(&self) -> &'static str {
        match self {
            ChatMode::Chat => "",
            ChatMode::Coding => {
                "You are a web development expert. Help me write clean, readable and efficient code."
            }
            ChatMode::Math => {
                "You are a mathematics professor. Solve problems step by step in full detail."
            }
            ChatMode::ImageGen => "You are an expert at writing prompts for AI image generators.",
        }
    }

    pub fn welcome_message(&self) -> &'static str {
        match self {
            ChatMode::Chat => {
                "Hello! I am **BACH AI**.\n\nI can help you with programming, math, image generation and general questions."
            }
            ChatMode::Coding => {
                "Hello! I am in **Web Development** mode. How can I help with your project?"
            }
            ChatMode::Math => "Hello! I am in **Math** mode. Send me the problem you need help with.",
            ChatMode::ImageGen => {
                "Hello! I am in **AI Image** mode. Describe the picture you want me to create."
            }
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ChatMode::ImageGen)
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(ChatMode::Chat),
            "coding" | "code" => Ok(ChatMode::Coding),
            "math" => Ok(ChatMode::Math),
            "image" | "image-gen" | "image_gen" => Ok(ChatMode::ImageGen),
            other => Err(crate::Error::validation(format!(
                "unknown mode '{other}' (expected chat, coding, math or image)"
            ))),
        }
    }
}
