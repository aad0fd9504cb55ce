//! Gemini REST backend
//!
//! - Chat uses `models/{model}:streamGenerateContent?alt=sse`; each SSE record is a
//!   full `GenerateContentResponse` whose `candidates[0].content.parts[*].text` is
//!   the next fragment.
//! - Images use `models/{model}:predict` with Imagen `instances`/`parameters`.
//! - The API key travels in the `x-goog-api-key` header.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::content::{GeneratedImage, ImageGenerationConfig, UpstreamChat};
use super::GenerativeBackend;
use crate::config::RelayConfig;
use crate::error::TransportError;
use crate::sse::{decode_stream, SseDecoder, SseRecord};
use crate::{BoxStream, Error, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl GeminiBackend {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.upstream_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// Request body for `streamGenerateContent`.
    pub fn chat_body(request: &UpstreamChat) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|c| json!({ "role": c.role, "parts": c.parts }))
            .collect();
        contents.push(json!({ "role": "user", "parts": request.message }));

        let mut body = json!({ "contents": contents });
        if !request.system_instruction.trim().is_empty() {
            body["systemInstruction"] = json!({
                "parts": [{ "text": request.system_instruction }]
            });
        }
        body
    }

    /// Request body for Imagen `predict`.
    pub fn image_body(prompt: &str, config: &ImageGenerationConfig) -> Value {
        json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": config.number_of_images,
                "aspectRatio": config.aspect_ratio,
                "outputOptions": { "mimeType": config.output_mime_type },
            }
        })
    }

    /// Text fragment carried by one streamed response, or the upstream error it
    /// reports. `Ok(None)` for records with no text (e.g. the final usage record).
    pub fn parse_stream_record(data: &str) -> Result<Option<String>> {
        let v: Value = serde_json::from_str(data).map_err(|e| Error::parse(data, e))?;

        if let Some(error) = v.get("error") {
            return Err(Error::upstream(error_message(error)));
        }

        if let Some(reason) = v
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
        {
            return Err(Error::upstream(format!("prompt blocked: {reason}")));
        }

        let text: String = v
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter(|p| !p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(if text.is_empty() { None } else { Some(text) })
    }

    pub fn parse_images(body: &Value) -> Vec<GeneratedImage> {
        body.get("predictions")
            .and_then(|p| p.as_array())
            .map(|predictions| {
                predictions
                    .iter()
                    .filter_map(|p| {
                        let bytes = p.get("bytesBase64Encoded")?.as_str()?;
                        Some(GeneratedImage {
                            image_bytes: bytes.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("error").map(error_message))
            .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), text.trim()));
        Err(Error::upstream(message))
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(|m| m.as_str())
        .map(String::from)
        .or_else(|| error.as_str().map(String::from))
        .unwrap_or_else(|| error.to_string())
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn stream_chat(&self, request: UpstreamChat) -> Result<BoxStream<'static, String>> {
        let url = format!(
            "{}?alt=sse",
            self.model_url(&self.text_model, "streamGenerateContent")
        );
        debug!(
            model = %self.text_model,
            turns = request.history.len(),
            parts = request.message.len(),
            "opening upstream chat stream"
        );
        let resp = self.post(&url, &Self::chat_body(&request)).await?;

        let bytes: BoxStream<'static, bytes::Bytes> =
            Box::pin(resp.bytes_stream().map_err(Error::from));
        let fragments = decode_stream(bytes, SseDecoder::default()).filter_map(|record| async move {
            match record {
                Ok(SseRecord::Data(data)) => match Self::parse_stream_record(&data) {
                    Ok(Some(text)) => Some(Ok(text)),
                    Ok(None) => None,
                    Err(e @ Error::Parse { .. }) => {
                        warn!(error = %e, "skipping malformed upstream record");
                        None
                    }
                    Err(e) => Some(Err(e)),
                },
                Ok(SseRecord::Done) => None,
                Err(e @ Error::Parse { .. }) => {
                    warn!(error = %e, "skipping malformed upstream record");
                    None
                }
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(fragments))
    }

    async fn generate_images(
        &self,
        prompt: &str,
        config: &ImageGenerationConfig,
    ) -> Result<Vec<GeneratedImage>> {
        let url = self.model_url(&self.image_model, "predict");
        debug!(model = %self.image_model, "requesting image generation");
        let resp = self.post(&url, &Self::image_body(prompt, config)).await?;
        let body: Value = resp.json().await?;
        Ok(Self::parse_images(&body))
    }
}
