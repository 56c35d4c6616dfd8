// ABOUTME: Line-buffering server-sent events parser shared by every streaming generation backend
// ABOUTME: Also holds the retry policy applied to the initial HTTP request of a generation call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # SSE Stream Parser
//!
//! Gemini, `OpenAI` and Anthropic all stream answers as server-sent events.
//! Network chunks do not line up with event boundaries: one chunk may carry
//! several events, and one JSON payload may be split across two chunks. The
//! [`SseLineBuffer`] accumulates bytes until a full line is available, and
//! [`create_sse_stream`] turns a raw byte stream into a [`ChatStream`] given a
//! provider-specific `parse_data` function.
//!
//! Only `data:` fields are surfaced. `event:`, `id:`, `retry:` and comment lines
//! are dropped; every backend used here repeats the event type inside the JSON.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{future, Stream, StreamExt};

use super::{ChatStream, StreamChunk};
use crate::errors::AppError;

/// Terminal marker used by chat-completion style APIs
const DONE_MARKER: &str = "[DONE]";

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Interpret one complete line
fn parse_line(line: &str) -> Option<SseEvent> {
    let trimmed = line.trim();
    let data = trimmed
        .strip_prefix("data:")
        .map(str::trim_start)
        .filter(|data| !data.trim().is_empty())?;
    if data == DONE_MARKER {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(data.to_owned()))
    }
}

/// Line-buffering SSE parser that holds partial lines across chunk boundaries
///
/// Bytes are buffered raw and decoded one complete line at a time, so a
/// multi-byte character split across two network chunks survives intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Bytes received but not yet terminated by a newline
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning every event completed by it
    ///
    /// A trailing partial line stays buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let rest = self.buffer.split_off(newline + 1);
            let line = mem::replace(&mut self.buffer, rest);
            events.extend(parse_line(
                String::from_utf8_lossy(&line).trim_end_matches(['\n', '\r']),
            ));
        }
        events
    }

    /// Parse whatever is left once the byte stream has ended
    pub fn flush(&mut self) -> Vec<SseEvent> {
        parse_line(&String::from_utf8_lossy(&mem::take(&mut self.buffer)))
            .into_iter()
            .collect()
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// State carried through the unfold
struct SseStreamState<F> {
    bytes: ByteStream,
    parser: SseLineBuffer,
    pending: VecDeque<Result<StreamChunk, AppError>>,
    parse_data: F,
    provider_name: &'static str,
    ended: bool,
}

impl<F> SseStreamState<F>
where
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>>,
{
    fn enqueue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Data(payload) => {
                    if let Some(item) = (self.parse_data)(&payload) {
                        self.pending.push_back(item);
                    }
                }
                SseEvent::Done => self.pending.push_back(Ok(StreamChunk::done("stop"))),
            }
        }
    }
}

/// Turn a raw byte stream into a [`ChatStream`]
///
/// `parse_data` converts one provider-specific JSON payload into a chunk, or
/// returns `None` for payloads that carry no output (metadata, pings). Empty
/// non-final deltas are filtered out. A read error ends the stream after being
/// yielded once.
pub fn create_sse_stream<S, F>(
    byte_stream: S,
    parse_data: F,
    provider_name: &'static str,
) -> ChatStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>> + Send + 'static,
{
    let state = SseStreamState {
        bytes: Box::pin(byte_stream),
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        parse_data,
        provider_name,
        ended: false,
    };

    let stream = unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.ended {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let events = state.parser.feed(&bytes);
                    state.enqueue(events);
                }
                Some(Err(e)) => {
                    state.ended = true;
                    let error = AppError::external_service(
                        state.provider_name,
                        format!("Stream read error: {e}"),
                    );
                    return Some((Err(error), state));
                }
                None => {
                    state.ended = true;
                    let events = state.parser.flush();
                    state.enqueue(events);
                }
            }
        }
    });

    let filtered = stream.filter(|result| {
        future::ready(
            result
                .as_ref()
                .map_or(true, |chunk| !chunk.delta.is_empty() || chunk.is_final),
        )
    });

    Box::pin(filtered)
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Retry policy for the initial HTTP request of a generation call
///
/// Once a response has been received nothing is retried; for streams the
/// caller may already have consumed partial output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay cap for exponential backoff (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RetryConfig {
    /// No retries: every failure surfaces immediately
    #[must_use]
    pub const fn disabled() -> Self {
        Self::with_max_retries(0)
    }

    /// Exponential backoff from 500ms capped at 5s
    #[must_use]
    pub const fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }

    /// Whether any retry is allowed
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Backoff before retry number `attempt` (zero-based)
    ///
    /// `delay = min(initial_ms * 2^attempt, max_ms) + jitter(0..100ms)`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self
            .initial_delay_ms
            .saturating_mul(1_u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let capped_delay = base_delay.min(self.max_delay_ms);
        let jitter = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::from(d.subsec_millis()))
            % 100;
        Duration::from_millis(capped_delay + jitter)
    }
}

/// Transient HTTP statuses: 429, 502 and 503
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503)
}

/// Connection and timeout errors are worth retrying
#[must_use]
pub fn is_retryable_request_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}
