// ABOUTME: Integration tests for session memory and history compression
// ABOUTME: Threshold-triggered compression, rolling summaries and failure handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

mod common;

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::ScriptedProvider;
use pierre_coach::coach::{HistoryEntry, SessionCompressor, SessionManager, SessionState};
use pierre_coach::errors::{AppError, ErrorCode};
use pierre_coach::llm::prompts::PromptCompiler;
use pierre_coach::llm::{ModelId, ModelRegistry, ResponseFormat};

fn session_over(backend: Arc<ScriptedProvider>, threshold: usize) -> SessionManager {
    let registry = Arc::new(ModelRegistry::new().with_model(ModelId::Gemini20Flash, backend));
    let compressor = SessionCompressor::new(registry, Arc::new(PromptCompiler::new()), ModelId::Gemini20Flash);
    SessionManager::new(threshold, compressor)
}

async fn record(session: &mut SessionManager, range: Range<usize>) {
    for i in range {
        session
            .record_turn(format!("question {i}"), format!("answer {i}"))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_window_grows_until_threshold() {
    common::init_test_logging();
    let backend = ScriptedProvider::replying(r#"{"conversation_summary": "unused"}"#);
    let mut session = session_over(backend.clone(), 5);

    record(&mut session, 0..5).await;

    assert_eq!(session.active_window().len(), 5);
    assert!(session.compressed_summary().is_none());
    assert_eq!(backend.call_count(), 0);
    assert_eq!(session.history_for_prompt().len(), 5);
}

#[tokio::test]
async fn test_sixth_turn_compresses_all_but_latest() {
    let backend = ScriptedProvider::replying(r#"{"conversation_summary": "Alice asked about five runs."}"#);
    let mut session = session_over(backend.clone(), 5);

    record(&mut session, 0..6).await;

    assert_eq!(session.turn_log().len(), 6);
    assert_eq!(session.active_window().len(), 1);
    assert_eq!(session.active_window()[0].question, "question 5");
    assert_eq!(session.compressed_summary(), Some("Alice asked about five runs."));
    assert_eq!(session.state(), SessionState::Active);

    let request = &backend.requests()[0];
    assert!(matches!(
        &request.response_format,
        Some(ResponseFormat::JsonSchema { name, .. }) if name == "conversation_summary"
    ));
    let prompt = backend.last_prompt();
    assert!(prompt.contains("User: question 0"));
    assert!(prompt.contains("Coach: answer 4"));
    assert!(!prompt.contains("question 5"));

    let history = session.history_for_prompt();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], HistoryEntry::Summary("Alice asked about five runs.".to_owned()));
    assert_eq!(
        history[1],
        HistoryEntry::Exchange("User: question 5".to_owned(), "Coach: answer 5".to_owned())
    );
}

#[tokio::test]
async fn test_summaries_accumulate_across_compressions() {
    let backend = ScriptedProvider::sequence(&[
        r#"{"conversation_summary": "First block."}"#,
        "Second block.",
    ]);
    let mut session = session_over(backend.clone(), 2);

    record(&mut session, 0..3).await;
    record(&mut session, 3..5).await;

    assert_eq!(backend.call_count(), 2);
    assert_eq!(session.compressed_summary(), Some("First block.\nSecond block."));
    assert_eq!(session.active_window().len(), 1);
    assert_eq!(session.turn_log().len(), 5);
}

#[tokio::test]
async fn test_failed_compression_keeps_turn_and_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let backend = ScriptedProvider::new(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(AppError::external_service("Scripted", "overloaded"))
        } else {
            Ok(r#"{"conversation_summary": "Recovered."}"#.to_owned())
        }
    });
    let mut session = session_over(backend, 1);

    session.record_turn("q0", "a0").await.unwrap();
    let error = session.record_turn("q1", "a1").await.unwrap_err();

    assert_eq!(error.code, ErrorCode::ExternalServiceError);
    assert_eq!(session.turn_log().len(), 2);
    assert_eq!(session.active_window().len(), 2);
    assert!(session.compressed_summary().is_none());
    assert_eq!(session.state(), SessionState::Active);

    session.record_turn("q2", "a2").await.unwrap();

    assert_eq!(session.active_window().len(), 1);
    assert_eq!(session.compressed_summary(), Some("Recovered."));
    assert_eq!(session.turn_log().len(), 3);
}

#[tokio::test]
async fn test_empty_summary_is_an_error() {
    let mut session = session_over(ScriptedProvider::replying(r#"{"conversation_summary": "  "}"#), 1);

    session.record_turn("q0", "a0").await.unwrap();
    let error = session.record_turn("q1", "a1").await.unwrap_err();

    assert_eq!(error.code, ErrorCode::ExternalServiceError);
    assert_eq!(session.active_window().len(), 2);
}

#[tokio::test]
async fn test_compress_on_single_turn_is_noop() {
    let backend = ScriptedProvider::replying("unused");
    let mut session = session_over(backend.clone(), 5);

    session.compress().await.unwrap();
    session.record_turn("q0", "a0").await.unwrap();
    session.compress().await.unwrap();

    assert_eq!(backend.call_count(), 0);
    assert_eq!(session.active_window().len(), 1);
    assert_eq!(session.history_threshold(), 5);
}
