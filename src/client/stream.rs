//! Relay chat stream consumption.

use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sse::{decode_stream, SseDecoder, SseRecord};
use crate::types::StreamEnvelope;
use crate::{BoxStream, Error, Result};

/// Read a relay chat stream to its end, calling `on_chunk` with each text
/// delta as it arrives, and return the concatenated text.
///
/// - `[DONE]` ends the loop; so does end of input.
/// - An `{"error": ...}` record fails with [`Error::Stream`].
/// - Malformed records are logged and skipped.
/// - Once `cancel` fires, whatever has accumulated is returned as `Ok`, and
///   errors observed after cancellation are suppressed.
pub async fn consume_stream<F>(
    input: BoxStream<'static, Bytes>,
    mut on_chunk: F,
    cancel: &CancellationToken,
) -> Result<String>
where
    F: FnMut(&str),
{
    let mut records = decode_stream(input, SseDecoder::default());
    let mut text = String::new();
    let mut chunks = 0usize;

    loop {
        if cancel.is_cancelled() {
            debug!(chunks, "stream cancelled");
            return Ok(text);
        }

        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(chunks, "stream cancelled while waiting for data");
                return Ok(text);
            }
            next = records.next() => next,
        };

        let Some(item) = next else { break };
        match item {
            Ok(SseRecord::Done) => break,
            Ok(SseRecord::Data(payload)) => {
                let envelope = match serde_json::from_str::<StreamEnvelope>(&payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!(error = %Error::parse(payload, e), "skipping malformed stream record");
                        continue;
                    }
                };
                if let Some(message) = envelope.error_message() {
                    if cancel.is_cancelled() {
                        return Ok(text);
                    }
                    return Err(Error::stream(message));
                }
                if let Some(delta) = envelope.text.filter(|t| !t.is_empty()) {
                    text.push_str(&delta);
                    chunks += 1;
                    on_chunk(&delta);
                }
            }
            Err(e @ Error::Parse { .. }) => {
                warn!(error = %e, "skipping malformed stream record");
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return Ok(text);
                }
                return Err(e);
            }
        }
    }

    debug!(chunks, bytes = text.len(), "stream complete");
    Ok(text)
}
