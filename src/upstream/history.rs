//! Rebuilds upstream-shaped turns from relay history.

use super::content::{Content, Part, UpstreamRole};
use crate::types::{Attachment, HistoryTurn, Role};

/// Text sent upstream in place of an image the model generated earlier.
pub const IMAGE_PLACEHOLDER: &str = "[Image Generated]";

/// Text sent for a turn that would otherwise have no parts.
pub const FILLER_TEXT: &str = "...";

pub fn upstream_role(role: Role) -> UpstreamRole {
    match role {
        Role::User => UpstreamRole::User,
        Role::Model => UpstreamRole::Model,
    }
}

/// Parts for one history turn: attachments, then the image placeholder, then
/// the text. Never empty.
pub fn turn_parts(turn: &HistoryTurn) -> Vec<Part> {
    let mut parts: Vec<Part> = turn
        .attachments
        .iter()
        .map(|att| Part::inline(&att.mime_type, &att.data))
        .collect();

    if turn.generated_image.is_some() {
        parts.push(Part::text(IMAGE_PLACEHOLDER));
    }

    if !turn.content.trim().is_empty() {
        parts.push(Part::text(&turn.content));
    } else if parts.is_empty() {
        parts.push(Part::text(FILLER_TEXT));
    }

    parts
}

pub fn reconstruct_history(history: &[HistoryTurn]) -> Vec<Content> {
    history
        .iter()
        .map(|turn| Content {
            role: upstream_role(turn.role),
            parts: turn_parts(turn),
        })
        .collect()
}

/// Parts of the turn being sent: attachments first, text last. Empty text is
/// omitted, so the result is empty only when there is nothing to send.
pub fn current_parts(message: &str, attachments: &[Attachment]) -> Vec<Part> {
    let mut parts: Vec<Part> = attachments
        .iter()
        .map(|att| Part::inline(&att.mime_type, &att.data))
        .collect();
    if !message.is_empty() {
        parts.push(Part::text(message));
    }
    parts
}
