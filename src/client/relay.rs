use bytes::Bytes;
use futures::TryStreamExt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::stream::consume_stream;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::types::{
    Attachment, ChatRequest, ErrorBody, HistoryTurn, ImageRequest, ImageResponse, Turn,
};
use crate::{BoxStream, Error, Result};

/// HTTP client for the relay server.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    api_url: String,
}

impl RelayClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        url::Url::parse(&config.api_url).map_err(|e| {
            Error::configuration(format!("invalid relay URL '{}': {e}", config.api_url))
        })?;
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send one chat turn and stream the reply.
    ///
    /// `history` must not contain the turn being sent. `on_chunk` runs once per
    /// text delta, in arrival order, and the concatenation of all deltas is
    /// returned. Cancellation (before or during the call) is not an error: the
    /// text accumulated so far is returned.
    pub async fn stream_message<F>(
        &self,
        history: &[Turn],
        message: &str,
        attachments: &[Attachment],
        system_instruction: &str,
        on_chunk: F,
        cancel: &CancellationToken,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        if cancel.is_cancelled() {
            return Ok(String::new());
        }
        if message.is_empty() && attachments.is_empty() {
            return Err(Error::validation(
                "message may be empty only when attachments are present",
            ));
        }

        let body = ChatRequest {
            message: message.to_string(),
            attachments: attachments.to_vec(),
            history: history.iter().map(HistoryTurn::from).collect(),
            system_instruction: system_instruction.to_string(),
        };
        debug!(turns = body.history.len(), "sending chat turn to relay");

        let send = self.http.post(self.url("chat")).json(&body).send();
        let resp = match until_cancelled(cancel, send).await {
            None => return Ok(String::new()),
            Some(Ok(resp)) => resp,
            Some(Err(e)) if cancel.is_cancelled() => {
                debug!(error = %e, "ignoring transport error after cancellation");
                return Ok(String::new());
            }
            Some(Err(e)) => {
                error!(error = %e, "chat request failed");
                return Err(e.into());
            }
        };

        if !resp.status().is_success() {
            let err = status_error(resp).await;
            if cancel.is_cancelled() {
                return Ok(String::new());
            }
            error!(error = %err, "relay rejected chat request");
            return Err(err);
        }

        let bytes: BoxStream<'static, Bytes> = Box::pin(resp.bytes_stream().map_err(Error::from));
        let result = consume_stream(bytes, on_chunk, cancel).await;
        if let Err(e) = &result {
            error!(error = %e, "chat stream failed");
        }
        result
    }

    /// Generate one image for `prompt` and return it base64-encoded.
    ///
    /// Returns `Ok(None)` when `cancel` fires first.
    pub async fn generate_image(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let request = async {
            let resp = self
                .http
                .post(self.url("generate-image"))
                .json(&ImageRequest {
                    prompt: prompt.to_string(),
                })
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(status_error(resp).await);
            }
            let body: ImageResponse = resp.json().await?;
            Ok::<String, Error>(body.image_bytes)
        };

        match until_cancelled(cancel, request).await {
            None => Ok(None),
            Some(Ok(image)) => Ok(Some(image)),
            Some(Err(_)) if cancel.is_cancelled() => Ok(None),
            Some(Err(e)) => {
                error!(error = %e, "image generation failed");
                Err(e)
            }
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_url, endpoint)
    }
}

/// Run `fut` unless `cancel` fires first.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

/// Error for a non-2xx relay response. A JSON `{"error": ...}` body means the
/// relay reached upstream and upstream failed.
async fn status_error(resp: reqwest::Response) -> Error {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) if status.is_server_error() => Error::upstream(body.error),
        Ok(body) => Error::Transport(TransportError::Status {
            status: status.as_u16(),
            message: body.error,
        }),
        Err(_) => Error::Transport(TransportError::Status {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .map(String::from)
                .unwrap_or_else(|| text.trim().to_string()),
        }),
    }
}
