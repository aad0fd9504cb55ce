//! Client-side conversation state.
//!
//! A [`ChatSession`] owns the history of one conversation, its operating mode,
//! and the single live cancellation token. Starting a send or switching mode
//! cancels whatever request was in flight.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::RelayClient;
use crate::types::{Attachment, ChatMode, Turn};
use crate::{Error, Result};

/// Content given to the model turn that carries a generated image.
pub const IMAGE_CAPTION: &str = "Here is the image I created from your description:";

/// Content given to a model turn whose request failed.
pub const FAILURE_MESSAGE: &str =
    "Sorry, the server could not be reached. Make sure the relay backend is running.";

/// Shared slot holding the token of the request currently in flight.
///
/// Clones share the slot, so a handle taken before a send can stop it from
/// another task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    current: Arc<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl CancelHandle {
    /// Cancel the in-flight request. Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        match self.slot().token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot().token.is_some()
    }

    /// Install a fresh token, cancelling the previous one. Returns the token
    /// and its generation for [`finish`](Self::finish).
    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut slot = self.slot();
        if let Some(previous) = slot.token.replace(token.clone()) {
            debug!("cancelling previous request");
            previous.cancel();
        }
        slot.generation += 1;
        (slot.generation, token)
    }

    /// Clear the slot unless a newer request has replaced it.
    fn finish(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.generation == generation {
            slot.token = None;
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// How a send ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Cancelled,
}

/// One conversation: mode, history, and the in-flight request.
#[derive(Debug)]
pub struct ChatSession {
    mode: ChatMode,
    history: Vec<Turn>,
    cancel: CancelHandle,
}

impl ChatSession {
    pub fn new(mode: ChatMode) -> Self {
        Self {
            mode,
            history: vec![Turn::model(mode.welcome_message())],
            cancel: CancelHandle::default(),
        }
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn system_instruction(&self) -> &'static str {
        self.mode.system_instruction()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stop the in-flight request, if any.
    pub fn stop(&self) -> bool {
        self.cancel.cancel()
    }

    /// Cancel anything in flight, switch mode and reseed the history with the
    /// mode's welcome turn.
    pub fn reset(&mut self, mode: ChatMode) {
        self.cancel.cancel();
        self.mode = mode;
        self.history = vec![Turn::model(mode.welcome_message())];
    }

    /// Send `input` (plus `attachments`) and fill in the model's reply.
    ///
    /// Appends the user turn and an empty model turn, then either streams the
    /// reply into the model turn (calling `on_chunk` per delta) or, in image
    /// mode, stores the generated image on it. On failure the model turn is
    /// marked as errored and the error is returned; a cancelled send keeps its
    /// partial content and returns [`SendOutcome::Cancelled`].
    pub async fn send<F>(
        &mut self,
        client: &RelayClient,
        input: &str,
        attachments: Vec<Attachment>,
        mut on_chunk: F,
    ) -> Result<SendOutcome>
    where
        F: FnMut(&str),
    {
        let text = input.trim().to_string();
        if text.is_empty() && attachments.is_empty() {
            return Err(Error::validation("nothing to send"));
        }

        let (generation, token) = self.cancel.begin();

        self.history
            .push(Turn::user(text.clone()).with_attachments(attachments.clone()));
        let prior = relay_history(&self.history);
        self.history.push(Turn::model(String::new()));
        let reply_idx = self.history.len() - 1;

        let result = if self.mode.is_image() {
            client
                .generate_image(&text, &token)
                .await
                .map(|image| {
                    if let Some(image) = image {
                        let reply = &mut self.history[reply_idx];
                        reply.content = IMAGE_CAPTION.to_string();
                        reply.generated_image = Some(image);
                    }
                })
        } else {
            let instruction = self.mode.system_instruction();
            let reply = &mut self.history[reply_idx];
            client
                .stream_message(
                    &prior,
                    &text,
                    &attachments,
                    instruction,
                    |delta| {
                        reply.push_delta(delta);
                        on_chunk(delta);
                    },
                    &token,
                )
                .await
                .map(|_| ())
        };

        self.cancel.finish(generation);

        match result {
            Ok(()) if token.is_cancelled() => Ok(SendOutcome::Cancelled),
            Ok(()) => Ok(SendOutcome::Completed),
            Err(_) if token.is_cancelled() => Ok(SendOutcome::Cancelled),
            Err(e) => {
                self.history[reply_idx].mark_error(FAILURE_MESSAGE);
                Err(e)
            }
        }
    }
}

/// History to send with a turn: everything before the just-appended turn,
/// minus turns that carry nothing.
pub fn relay_history(history: &[Turn]) -> Vec<Turn> {
    match history.split_last() {
        Some((_, prior)) => prior.iter().filter(|t| !t.is_blank()).cloned().collect(),
        None => Vec::new(),
    }
}
