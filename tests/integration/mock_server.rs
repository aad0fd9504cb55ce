//! Test fixtures: a mockito HTTP server and an in-process fake backend

use async_trait::async_trait;
use bach_relay::sse::{SseDecoder, SseRecord};
use bach_relay::types::StreamEnvelope;
use bach_relay::upstream::{GeneratedImage, GenerativeBackend, ImageGenerationConfig, UpstreamChat};
use bach_relay::{BoxStream, Error, Result};
use futures::stream::{self, StreamExt};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::{Arc, Mutex};

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Relay API root served by this mock, e.g. `http://127.0.0.1:1234/api`.
    pub fn api_url(&self) -> String {
        format!("{}/api", self.base_url)
    }

    /// Mock an SSE response on `path` with a prebuilt body.
    pub async fn mock_sse_stream(&mut self, path: &str, body: &str) -> Mock {
        self.server
            .mock("POST", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    /// Like [`mock_sse_stream`](Self::mock_sse_stream), but only for requests
    /// whose JSON body equals `expected`.
    pub async fn mock_sse_for_body(
        &mut self,
        path: &str,
        expected: serde_json::Value,
        body: &str,
    ) -> Mock {
        self.server
            .mock("POST", path)
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(expected))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_json_response(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}

/// Decode a complete relay response body into its records.
pub fn records(body: &[u8]) -> Vec<SseRecord> {
    SseDecoder::default()
        .push(body)
        .into_iter()
        .map(|r| r.expect("record is valid UTF-8"))
        .collect()
}

/// Parse a data record's JSON envelope.
pub fn envelope(record: &SseRecord) -> StreamEnvelope {
    match record {
        SseRecord::Data(data) => serde_json::from_str(data).expect("record is JSON"),
        SseRecord::Done => panic!("expected a data record, got [DONE]"),
    }
}

/// Scripted [`GenerativeBackend`] that records what it was asked.
#[derive(Default)]
pub struct FakeBackend {
    fragments: Vec<std::result::Result<String, String>>,
    hang_after_fragments: bool,
    start_error: Option<String>,
    images: Vec<String>,
    image_error: Option<String>,
    chats: Mutex<Vec<UpstreamChat>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn streaming(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            ..Self::default()
        }
    }

    /// Yield `fragments`, then fail with `message`.
    pub fn failing_after(fragments: &[&str], message: &str) -> Self {
        let mut backend = Self::streaming(fragments);
        backend.fragments.push(Err(message.to_string()));
        backend
    }

    pub fn failing_to_start(message: &str) -> Self {
        Self {
            start_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Yield `fragments`, then never finish.
    pub fn hanging_after(fragments: &[&str]) -> Self {
        Self {
            hang_after_fragments: true,
            ..Self::streaming(fragments)
        }
    }

    pub fn with_images(images: &[&str]) -> Self {
        Self {
            images: images.iter().map(|i| i.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_images(message: &str) -> Self {
        Self {
            image_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn chats(&self) -> Vec<UpstreamChat> {
        self.chats.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for FakeBackend {
    async fn stream_chat(&self, request: UpstreamChat) -> Result<BoxStream<'static, String>> {
        self.chats.lock().unwrap().push(request);
        if let Some(message) = &self.start_error {
            return Err(Error::upstream(message.clone()));
        }

        let items: Vec<Result<String>> = self
            .fragments
            .iter()
            .map(|f| f.clone().map_err(Error::upstream))
            .collect();
        let fragments = stream::iter(items);
        if self.hang_after_fragments {
            Ok(Box::pin(fragments.chain(stream::pending())))
        } else {
            Ok(Box::pin(fragments))
        }
    }

    async fn generate_images(
        &self,
        prompt: &str,
        _config: &ImageGenerationConfig,
    ) -> Result<Vec<GeneratedImage>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(message) = &self.image_error {
            return Err(Error::upstream(message.clone()));
        }
        Ok(self
            .images
            .iter()
            .map(|image| GeneratedImage {
                image_bytes: image.clone(),
            })
            .collect())
    }
}
