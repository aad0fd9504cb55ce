//! Incremental SSE record decoder (Bytes -> records)

use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::VecDeque;

use crate::{BoxStream, Error, Result};

/// Field name that marks a payload line.
pub const DATA_PREFIX: &str = "data:";
/// Payload of the record that ends a stream.
pub const DONE_SIGNAL: &str = "[DONE]";

/// Longest record boundary (`\r\n\r\n`) minus one: a boundary split across
/// reads starts at most this many bytes before the end of the previous read.
const BOUNDARY_CARRY: usize = 3;

/// One complete SSE record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseRecord {
    /// Payload of the record's `data:` lines, joined with `\n`.
    Data(String),
    /// The terminal `[DONE]` record.
    Done,
}

/// Accumulate-then-split SSE parser.
///
/// - buffers raw bytes until a blank line (`\n\n` or `\r\n\r\n`) closes a record
/// - collects the record's `data:` lines; comment and `event:`/`id:` lines are ignored
/// - reports `[DONE]` as [`SseRecord::Done`]
///
/// Bytes after the last boundary stay buffered; a truncated record is never parsed.
/// Each read is scanned once, so a large record arriving in small reads stays linear.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Bytes received but not yet closed by a record boundary.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Feed one network read; returns every record it completed, in order.
    ///
    /// A completed record that is not valid UTF-8 yields [`Error::Parse`] in its
    /// slot; later records are unaffected.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<SseRecord>> {
        // The buffer holds no complete boundary here, so only its tail can
        // begin one.
        let mut scan_from = self.buf.len().saturating_sub(BOUNDARY_CARRY);
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        let mut start = 0;
        while let Some((idx, len)) = find_boundary(&self.buf[scan_from..]) {
            let end = scan_from + idx;
            let raw = &self.buf[start..end];
            match std::str::from_utf8(raw) {
                Ok(text) => {
                    if let Some(record) = parse_record(text) {
                        out.push(Ok(record));
                    }
                }
                Err(e) => out.push(Err(Error::parse(
                    String::from_utf8_lossy(raw).into_owned(),
                    e,
                ))),
            }
            start = end + len;
            scan_from = start;
        }
        self.buf.drain(..start);
        out
    }
}

fn parse_record(text: &str) -> Option<SseRecord> {
    let mut data: Option<String> = None;
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        // A single leading space after the field name is not part of the value.
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        match data.as_mut() {
            Some(d) => {
                d.push('\n');
                d.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    let data = data?;
    if data.trim() == DONE_SIGNAL {
        Some(SseRecord::Done)
    } else {
        Some(SseRecord::Data(data))
    }
}

/// Position and length of the first record boundary in `buf`.
fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    for i in 0..buf.len() {
        if buf[i..].starts_with(b"\n\n") {
            return Some((i, 2));
        }
        if buf[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
    }
    None
}

/// Decode a byte stream into SSE records.
///
/// The output ends after [`SseRecord::Done`], after the first transport error,
/// or at end of input. Unterminated trailing bytes at end of input are dropped.
pub fn decode_stream(
    input: BoxStream<'static, Bytes>,
    decoder: SseDecoder,
) -> BoxStream<'static, SseRecord> {
    let state = (input, decoder, VecDeque::<Result<SseRecord>>::new(), false);
    let stream = stream::unfold(
        state,
        |(mut input, mut decoder, mut ready, finished)| async move {
            loop {
                if let Some(item) = ready.pop_front() {
                    if matches!(item, Ok(SseRecord::Done)) {
                        ready.clear();
                        return Some((item, (input, decoder, ready, true)));
                    }
                    return Some((item, (input, decoder, ready, finished)));
                }
                if finished {
                    return None;
                }

                match input.next().await {
                    Some(Ok(bytes)) => {
                        ready.extend(decoder.push(&bytes));
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (input, decoder, ready, true)));
                    }
                    None => {
                        if decoder.pending() > 0 {
                            tracing::debug!(
                                bytes = decoder.pending(),
                                "discarding unterminated trailing SSE record"
                            );
                        }
                        return None;
                    }
                }
            }
        },
    );
    Box::pin(stream)
}
