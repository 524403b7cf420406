//! Manual `text/event-stream` framing
//!
//! Used by providers whose streaming body is consumed as raw bytes rather than
//! through `eventsource-stream`. The parser decodes UTF-8 incrementally, splits
//! on `\n`, and yields the JSON payload of every `data:` line until the
//! `[DONE]` sentinel. Only the trailing partial line is ever retained.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use crate::error::LlmError;

/// Payload that terminates an OpenAI-style event stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental line parser over a chunked byte stream
#[derive(Debug)]
pub struct FrameParser {
    provider: String,
    /// Undecoded bytes, at most one incomplete UTF-8 sequence
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    line: String,
    done: bool,
}

impl FrameParser {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_owned(),
            pending: Vec::new(),
            line: String::new(),
            done: false,
        }
    }

    /// Whether the `[DONE]` sentinel has been seen
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one read's worth of bytes, returning the payloads it completed
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<serde_json::Value> {
        let mut payloads = Vec::new();
        if self.done {
            return payloads;
        }

        self.decode(bytes);
        self.drain_lines(&mut payloads);
        payloads
    }

    /// Flush at end of input, processing a final unterminated line
    pub fn finish(&mut self) -> Vec<serde_json::Value> {
        let mut payloads = Vec::new();
        if self.done {
            return payloads;
        }

        if !self.pending.is_empty() {
            self.line.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        self.drain_lines(&mut payloads);

        let rest = std::mem::take(&mut self.line);
        self.process_line(rest.trim_end_matches('\r'), &mut payloads);
        payloads
    }

    /// Decode as much of the pending bytes as forms complete UTF-8
    ///
    /// An incomplete sequence at the end is carried into the next read;
    /// invalid sequences become U+FFFD.
    fn decode(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    self.line.push_str(text);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    self.line
                        .push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            self.line.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
    }

    fn drain_lines(&mut self, payloads: &mut Vec<serde_json::Value>) {
        while !self.done {
            let Some(newline) = self.line.find('\n') else {
                break;
            };
            let line: String = self.line.drain(..=newline).collect();
            self.process_line(line.trim_end_matches(['\n', '\r']), payloads);
        }
    }

    fn process_line(&mut self, line: &str, payloads: &mut Vec<serde_json::Value>) {
        if line.is_empty() || line.starts_with(':') {
            return;
        }

        let Some(data) = line.strip_prefix("data:") else {
            // `event:`, `id:` and `retry:` fields carry nothing we use
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data == DONE_SENTINEL {
            self.done = true;
            self.line.clear();
            self.pending.clear();
            return;
        }

        match serde_json::from_str(data) {
            Ok(value) => payloads.push(value),
            Err(e) => {
                tracing::warn!(
                    provider = %self.provider,
                    error = %e,
                    "skipping unparseable stream frame"
                );
            }
        }
    }
}

struct FrameState<S> {
    bytes: Pin<Box<S>>,
    parser: FrameParser,
    ready: VecDeque<serde_json::Value>,
    exhausted: bool,
}

/// Turn a byte stream into a lazy stream of decoded JSON payloads
///
/// The stream ends at the `[DONE]` sentinel without reading further bytes, or
/// when the byte stream ends. A read error is yielded once and ends the stream.
pub fn frames<S, B, E>(provider: &str, bytes: S) -> impl Stream<Item = Result<serde_json::Value, LlmError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = FrameState {
        bytes: Box::pin(bytes),
        parser: FrameParser::new(provider),
        ready: VecDeque::new(),
        exhausted: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.ready.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.exhausted || state.parser.is_done() {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.parser.feed(chunk.as_ref());
                    state.ready.extend(payloads);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    let error = LlmError::transport(&state.parser.provider, format!("stream read failed: {e}"));
                    return Some((Err(error), state));
                }
                None => {
                    state.exhausted = true;
                    let payloads = state.parser.finish();
                    state.ready.extend(payloads);
                }
            }
        }
    })
}
