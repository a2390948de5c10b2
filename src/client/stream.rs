//! Client side of the NDJSON event stream.

use crate::{
    error::{RelayError, Result},
    models::{StreamEvent, UNKNOWN_STREAM_ERROR},
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;

/// Splits raw bytes into lines. Bytes are buffered before decoding, so a
/// multi-byte character cut by a chunk boundary is reassembled intact.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and take every line it completed, in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            if let Some(line) = decode_line(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        lines
    }

    /// Take whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn parse_line(line: &str) -> Result<StreamEvent> {
    serde_json::from_str(line)
        .map_err(|e| RelayError::Parse(format!("Malformed stream line: {}", e)))
}

/// Receivers for stream events. Every method defaults to doing nothing.
pub trait StreamCallbacks {
    fn on_start(&mut self) {}
    fn on_generating(&mut self) {}
    fn on_progress(&mut self, _image_data: &str, _estimated_cost: f64) {}
    fn on_complete(&mut self) {}
    fn on_error(&mut self, _message: &str) {}
}

/// How strictly malformed lines are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamPolicy {
    /// `None` skips malformed lines forever. `Some(n)` reports an error and
    /// stops after more than `n` malformed lines in a row.
    pub max_consecutive_malformed: Option<usize>,
}

impl StreamPolicy {
    pub fn lenient() -> Self {
        Self::default()
    }

    pub fn with_max_consecutive_malformed(mut self, limit: usize) -> Self {
        self.max_consecutive_malformed = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub events: usize,
    pub malformed: usize,
    /// Status of the last terminal event seen, if any.
    pub terminal: Option<&'static str>,
    /// Consumption stopped early on a transport failure or the malformed-line limit.
    pub aborted: bool,
}

/// Read `stream` to the end, dispatching each event to `callbacks` in order.
pub async fn consume_events<S, E, C>(
    stream: S,
    callbacks: &mut C,
    policy: StreamPolicy,
) -> ConsumeSummary
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
    C: StreamCallbacks + ?Sized,
{
    let mut consumer = Consumer {
        callbacks,
        policy,
        summary: ConsumeSummary::default(),
        consecutive_malformed: 0,
    };
    let mut decoder = LineDecoder::new();
    futures::pin_mut!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                log::error!("Event stream read failed: {}", e);
                consumer.callbacks.on_error(&format!("Stream interrupted: {}", e));
                consumer.summary.aborted = true;
                return consumer.summary;
            }
        };
        for line in decoder.push(&chunk) {
            if !consumer.handle_line(&line) {
                return consumer.summary;
            }
        }
    }

    if let Some(line) = decoder.finish() {
        consumer.handle_line(&line);
    }
    if consumer.summary.terminal.is_none() {
        log::warn!("Event stream ended without a terminal event");
    }
    consumer.summary
}

struct Consumer<'a, C: ?Sized> {
    callbacks: &'a mut C,
    policy: StreamPolicy,
    summary: ConsumeSummary,
    consecutive_malformed: usize,
}

impl<C: StreamCallbacks + ?Sized> Consumer<'_, C> {
    /// Returns `false` when consumption must stop.
    fn handle_line(&mut self, line: &str) -> bool {
        let event = match parse_line(line) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Skipping stream line: {} ({} bytes)", e, line.len());
                self.summary.malformed += 1;
                self.consecutive_malformed += 1;
                if let Some(limit) = self.policy.max_consecutive_malformed {
                    if self.consecutive_malformed > limit {
                        self.callbacks.on_error(&format!(
                            "Received {} malformed stream lines in a row",
                            self.consecutive_malformed
                        ));
                        self.summary.aborted = true;
                        return false;
                    }
                }
                return true;
            }
        };

        self.consecutive_malformed = 0;
        self.summary.events += 1;
        log::debug!("Stream event: {}", event.status());
        if event.is_terminal() {
            self.summary.terminal = Some(event.status());
        }

        match event {
            StreamEvent::Starting => self.callbacks.on_start(),
            StreamEvent::Generating => self.callbacks.on_generating(),
            StreamEvent::Progress {
                image_data,
                estimated_cost,
                ..
            } => self.callbacks.on_progress(&image_data, estimated_cost),
            StreamEvent::Complete => self.callbacks.on_complete(),
            StreamEvent::Error { error } => self
                .callbacks
                .on_error(error.as_deref().unwrap_or(UNKNOWN_STREAM_ERROR)),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_holds_partial_lines() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"status\":").is_empty());
        assert_eq!(decoder.pending(), 10);
        assert_eq!(decoder.push(b"\"starting\"}\n{"), vec![r#"{"status":"starting"}"#]);
        assert_eq!(decoder.finish().as_deref(), Some("{"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn long_line_is_scanned_once() {
        let mut decoder = LineDecoder::new();
        let payload = "A".repeat(4096);
        decoder.push(b"{\"status\":\"progress\",\"imageData\":\"");
        for piece in payload.as_bytes().chunks(7) {
            assert!(decoder.push(piece).is_empty());
            assert_eq!(decoder.scanned, decoder.pending());
        }
        let lines = decoder.push(b"\",\"estimatedCost\":0.02}\n{\"status\":\"comp");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(&payload));
        assert_eq!(decoder.scanned, decoder.pending());
        assert_eq!(decoder.push(b"lete\"}\n"), vec![r#"{"status":"complete"}"#]);
        assert_eq!(decoder.pending(), 0);
        assert_eq!(decoder.scanned, 0);
    }

    #[test]
    fn decoder_skips_blank_lines_and_crlf() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"\n\r\n{\"status\":\"complete\"}\r\n");
        assert_eq!(lines, vec![r#"{"status":"complete"}"#]);
    }

    #[test]
    fn decoder_reassembles_split_characters() {
        let text = "{\"status\":\"error\",\"error\":\"caf\u{e9}\"}\n";
        let bytes = text.as_bytes();
        let split = text.find('\u{e9}').unwrap() + 1;
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        let lines = decoder.push(&bytes[split..]);
        assert_eq!(lines, vec![text.trim_end().to_string()]);
    }

    #[test]
    fn parse_line_reports_parse_errors() {
        assert!(matches!(parse_line("not json"), Err(RelayError::Parse(_))));
        assert!(matches!(parse_line(r#"{"status":"other"}"#), Err(RelayError::Parse(_))));
        assert_eq!(parse_line(r#"{"status":"generating"}"#).unwrap(), StreamEvent::Generating);
    }
}
