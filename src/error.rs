use thiserror::Error;

/// Unified error type for the relay and its client.
///
/// There is no cancellation variant: a cancelled request resolves to `Ok`
/// with whatever text had accumulated.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or HTTP failure before the response stream started.
    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    /// An `{"error": ...}` record arrived in the middle of a stream.
    #[error("Stream error: {message}")]
    Stream { message: String },

    /// A data record that could not be decoded. Consumers log and skip these.
    #[error("Malformed SSE record ({reason}): {record}")]
    Parse { record: String, reason: String },

    /// The upstream generative model failed.
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn stream(message: impl Into<String>) -> Self {
        Error::Stream {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn parse(record: impl Into<String>, reason: impl ToString) -> Self {
        Error::Parse {
            record: record.into(),
            reason: reason.to_string(),
        }
    }

    /// Message suitable for an `{"error": ...}` payload. Upstream and stream
    /// errors expose their bare message; everything else uses `Display`.
    pub fn client_message(&self) -> String {
        match self {
            Error::Upstream { message } | Error::Stream { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The peer answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(TransportError::Http(e))
    }
}
