// ABOUTME: Integration tests for the SSE parser shared by the streaming generation backends
// ABOUTME: Covers event batching, split payloads, stream termination and the retry policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use pierre_coach::errors::AppError;
use pierre_coach::llm::sse_parser::{
    create_sse_stream, is_retryable_status, RetryConfig, SseEvent, SseLineBuffer,
};
use pierre_coach::llm::{collect_stream, StreamChunk};
use serde_json::Value;

/// Payloads look like `{"text": "...", "last": true}`
fn parse_test_payload(payload: &str) -> Option<Result<StreamChunk, AppError>> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let text = value.get("text")?.as_str()?;
    if value.get("last").and_then(Value::as_bool).unwrap_or(false) {
        return Some(Ok(StreamChunk {
            delta: text.to_owned(),
            is_final: true,
            finish_reason: Some("stop".to_owned()),
        }));
    }
    Some(Ok(StreamChunk::text(text)))
}

async fn chunks_from(parts: &[&'static str]) -> Vec<StreamChunk> {
    let bytes = stream::iter(
        parts
            .iter()
            .copied()
            .map(|part| Ok::<Bytes, reqwest::Error>(Bytes::from_static(part.as_bytes())))
            .collect::<Vec<_>>(),
    );
    let mut stream = create_sse_stream(bytes, parse_test_payload, "Test");

    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        chunks.push(item.unwrap());
    }
    chunks
}

#[tokio::test]
async fn test_batched_events_all_surface() {
    let chunks = chunks_from(&[
        "data: {\"text\":\"Keep \"}\n\ndata: {\"text\":\"cadence \"}\n\ndata: {\"text\":\"high\"}\n\n",
        "data: [DONE]\n\n",
    ])
    .await;

    let deltas: Vec<&str> = chunks.iter().map(|c| c.delta.as_str()).collect();
    assert_eq!(deltas, ["Keep ", "cadence ", "high", ""]);
    assert!(chunks[3].is_final);
}

#[tokio::test]
async fn test_payload_split_across_network_chunks() {
    let chunks = chunks_from(&[
        "data: {\"text\":\"strid",
        "e length\"}\n",
        "\ndata: [DONE]\n\n",
    ])
    .await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].delta, "stride length");
}

#[tokio::test]
async fn test_stream_without_done_marker_ends_on_eof() {
    let chunks = chunks_from(&[
        "data: {\"text\":\"one\"}\n\n",
        "data: {\"text\":\"two\",\"last\":true}",
    ])
    .await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].delta, "two");
    assert!(chunks[1].is_final);
}

#[tokio::test]
async fn test_bad_payloads_and_empty_deltas_dropped() {
    let chunks = chunks_from(&[
        "data: {\"text\":\"\"}\n\n",
        "data: {broken\n\n",
        ": keep-alive\n\n",
        "data: {\"text\":\"ok\"}\r\n\r\n",
    ])
    .await;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].delta, "ok");
}

#[tokio::test]
async fn test_collect_stream_concatenates_deltas() {
    let bytes = stream::iter(vec![
        Ok::<Bytes, reqwest::Error>(Bytes::from_static(b"data: {\"text\":\"Land \"}\n\n")),
        Ok(Bytes::from_static(b"data: {\"text\":\"softly\",\"last\":true}\n\n")),
    ]);
    let text = collect_stream(create_sse_stream(bytes, parse_test_payload, "Test"))
        .await
        .unwrap();
    assert_eq!(text, "Land softly");
}

#[test]
fn test_line_buffer_ignores_non_data_fields() {
    let mut buffer = SseLineBuffer::new();
    let events = buffer.feed(b"event: content_block_delta\nid: 7\nretry: 100\ndata: {\"a\":1}\n\n");
    assert_eq!(events, [SseEvent::Data("{\"a\":1}".to_owned())]);
}

#[test]
fn test_line_buffer_keeps_multibyte_char_split_across_chunks() {
    let line = "data: {\"text\":\"café — ok\"}\n".as_bytes();
    let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
    let mut buffer = SseLineBuffer::new();

    assert!(buffer.feed(&line[..split]).is_empty());
    let events = buffer.feed(&line[split..]);

    assert_eq!(events, [SseEvent::Data("{\"text\":\"café — ok\"}".to_owned())]);
}

#[tokio::test]
async fn test_stream_delta_survives_split_utf8() {
    let line = "data: {\"text\":\"naïve — pace\"}\n\n".as_bytes();
    let split = line.iter().position(|&b| b == 0xE2).unwrap() + 2;
    let bytes = stream::iter(vec![
        Ok::<Bytes, reqwest::Error>(Bytes::copy_from_slice(&line[..split])),
        Ok(Bytes::copy_from_slice(&line[split..])),
    ]);

    let text = collect_stream(create_sse_stream(bytes, parse_test_payload, "Test"))
        .await
        .unwrap();

    assert_eq!(text, "naïve — pace");
}

#[test]
fn test_line_buffer_holds_partial_line_until_flush() {
    let mut buffer = SseLineBuffer::new();
    assert!(buffer.feed(b"data: [DO").is_empty());
    assert!(buffer.feed(b"NE]").is_empty());
    assert_eq!(buffer.flush(), [SseEvent::Done]);
    assert!(buffer.flush().is_empty());
}

#[test]
fn test_retry_backoff_doubles_then_caps() {
    let retry = RetryConfig::with_max_retries(3);
    assert!(retry.is_enabled());

    let first = retry.delay_for_attempt(0).as_millis();
    let second = retry.delay_for_attempt(1).as_millis();
    let capped = retry.delay_for_attempt(6).as_millis();
    assert!((500..600).contains(&first));
    assert!((1000..1100).contains(&second));
    assert!((5000..5100).contains(&capped));
}

#[test]
fn test_retries_disabled_by_default() {
    assert_eq!(RetryConfig::default(), RetryConfig::disabled());
    assert!(!RetryConfig::default().is_enabled());
}

#[test]
fn test_only_transient_statuses_are_retryable() {
    for status in [429, 502, 503] {
        assert!(is_retryable_status(status), "{status} should retry");
    }
    for status in [200, 400, 401, 404, 500, 504] {
        assert!(!is_retryable_status(status), "{status} should not retry");
    }
}
