use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Json,
};
use futures::{stream, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::sse::decode::DONE_SIGNAL;
use crate::types::{ChatRequest, StreamEnvelope};
use crate::upstream::{current_parts, reconstruct_history, GenerativeBackend, UpstreamChat};
use crate::{BoxStream, Error};

// POST /api/chat
//
// Always answers 200 with an event stream; failures after that point are
// reported as a single `{"error": ...}` record.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    info!(
        turns = request.history.len(),
        attachments = request.attachments.len(),
        "relaying chat turn"
    );

    let upstream = UpstreamChat {
        history: reconstruct_history(&request.history),
        system_instruction: request.system_instruction,
        message: current_parts(&request.message, &request.attachments),
    };

    (
        [(header::CONNECTION, "keep-alive")],
        Sse::new(relay_events(state.backend.clone(), upstream)),
    )
}

enum Relay {
    Start(Arc<dyn GenerativeBackend>, UpstreamChat),
    Streaming(BoxStream<'static, String>, usize),
    Finished,
}

/// Turns one upstream chat into relay records: a text record per fragment,
/// then `[DONE]`, or a single error record.
pub fn relay_events(
    backend: Arc<dyn GenerativeBackend>,
    request: UpstreamChat,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream::unfold(Relay::Start(backend, request), |state| async move {
        match state {
            Relay::Start(backend, request) => {
                if request.message.is_empty() {
                    let err = Error::validation("message must contain text or attachments");
                    warn!(error = %err, "rejecting empty chat turn");
                    return Some((Ok(error_event(&err)), Relay::Finished));
                }
                match backend.stream_chat(request).await {
                    Ok(fragments) => next_event(fragments, 0).await,
                    Err(e) => {
                        error!(error = %e, "upstream chat failed to start");
                        Some((Ok(error_event(&e)), Relay::Finished))
                    }
                }
            }
            Relay::Streaming(fragments, sent) => next_event(fragments, sent).await,
            Relay::Finished => None,
        }
    })
}

async fn next_event(
    mut fragments: BoxStream<'static, String>,
    sent: usize,
) -> Option<(Result<Event, Infallible>, Relay)> {
    loop {
        match fragments.next().await {
            Some(Ok(text)) if text.is_empty() => continue,
            Some(Ok(text)) => {
                let event = envelope_event(&StreamEnvelope::text(text));
                return Some((Ok(event), Relay::Streaming(fragments, sent + 1)));
            }
            Some(Err(e)) => {
                error!(error = %e, chunks = sent, "upstream chat failed mid-stream");
                return Some((Ok(error_event(&e)), Relay::Finished));
            }
            None => {
                debug!(chunks = sent, "upstream chat complete");
                return Some((
                    Ok(Event::default().data(DONE_SIGNAL)),
                    Relay::Finished,
                ));
            }
        }
    }
}

fn error_event(err: &Error) -> Event {
    envelope_event(&StreamEnvelope::error(err.client_message()))
}

fn envelope_event(envelope: &StreamEnvelope) -> Event {
    match serde_json::to_string(envelope) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            error!(error = %e, "failed to encode stream envelope");
            Event::default().data(r#"{"error":"Internal Server Error"}"#)
        }
    }
}
