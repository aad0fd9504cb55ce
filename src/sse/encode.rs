//! SSE record encoding for the relay's chat stream

use crate::types::StreamEnvelope;
use crate::Result;

/// The literal record that ends a successful chat stream.
pub const DONE_RECORD: &str = "data: [DONE]\n\n";

/// Render one `data:` record carrying `envelope` as JSON.
pub fn encode_envelope(envelope: &StreamEnvelope) -> Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(envelope)?))
}

/// Render a whole chat stream body: one text record per delta, then either an
/// error record or the done record.
pub fn encode_stream_body<I, S>(deltas: I, error: Option<&str>) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut body = String::new();
    for delta in deltas {
        body.push_str(&encode_envelope(&StreamEnvelope::text(delta))?);
    }
    match error {
        Some(message) => body.push_str(&encode_envelope(&StreamEnvelope::error(message))?),
        None => body.push_str(DONE_RECORD),
    }
    Ok(body)
}
