// ABOUTME: End-to-end tests of the coach service over scripted generation backends
// ABOUTME: Blocking and streamed turns, cancellation, grounding, error turns and session wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

mod common;

use std::sync::{Arc, Mutex};

use common::{decision_json, FailingFactChecker, ScriptedProvider, StaticFactChecker};
use pierre_coach::coach::{CoachService, HistoryEntry, ProgressReporter, ProgressStage, ProgressUpdate};
use pierre_coach::config::CoachConfig;
use pierre_coach::errors::ErrorCode;
use pierre_coach::grounding::FactChecker;
use pierre_coach::llm::{ModelId, ModelRegistry};
use pierre_core::constants::retrieval::GROUNDING_SUFFIX;
use pierre_core::constants::session::ERROR_ANSWER_PREFIX;
use serde_json::json;
use tokio_util::sync::CancellationToken;

struct Backends {
    router: Arc<ScriptedProvider>,
    summary: Arc<ScriptedProvider>,
    answer: Arc<ScriptedProvider>,
}

impl Backends {
    fn new(decision: &str, answer: &str) -> Self {
        Self {
            router: ScriptedProvider::replying(decision),
            summary: ScriptedProvider::replying(r#"{"conversation_summary": "Earlier chat."}"#),
            answer: ScriptedProvider::replying(answer),
        }
    }

    fn registry(&self) -> ModelRegistry {
        common::registry_with(
            Arc::clone(&self.router),
            Arc::clone(&self.summary),
            Arc::clone(&self.answer),
        )
    }
}

async fn coach_with(backends: &Backends, fact_checker: Arc<dyn FactChecker>) -> CoachService {
    CoachService::for_user(
        common::sample_dependencies(backends.registry(), fact_checker),
        CoachConfig::default(),
        common::SAMPLE_USER,
    )
    .await
    .unwrap()
}

fn no_evidence() -> Arc<dyn FactChecker> {
    StaticFactChecker::new(json!({}))
}

#[tokio::test]
async fn test_question_about_yesterdays_run() {
    common::init_test_logging();
    let backends = Backends::new(
        &decision_json(false, true, false, false, &[97]),
        "Your run yesterday was steady, with even knee angles.",
    );
    let mut coach = coach_with(&backends, no_evidence()).await;

    let answer = coach.ask("How was my run yesterday?").await.unwrap();

    assert!(!answer.is_empty());
    assert_eq!(coach.turn_log().len(), 1);
    assert_eq!(coach.turn_log()[0].question, "How was my run yesterday?");
    assert_eq!(coach.turn_log()[0].answer, answer);

    let prompt = backends.answer.last_prompt();
    assert!(prompt.contains("How was my run yesterday?"));
    assert!(prompt.contains("averages_across_units"));
    assert!(!prompt.contains(GROUNDING_SUFFIX));

    let request = &backends.answer.requests()[0];
    assert_eq!(request.model.as_deref(), Some(ModelId::Gemini25FlashPreview.as_str()));
    assert!(request.temperature.is_some());
    assert_eq!(backends.summary.call_count(), 0);
}

#[tokio::test]
async fn test_history_reaches_the_next_route() {
    let backends = Backends::new(&decision_json(false, false, false, false, &[]), "Keep it easy.");
    let mut coach = coach_with(&backends, no_evidence()).await;

    coach.ask("Should I run today?").await.unwrap();
    coach.ask("And tomorrow?").await.unwrap();

    assert_eq!(coach.turn_log().len(), 2);
    assert!(backends.router.last_prompt().contains("User: Should I run today?"));
    assert_eq!(
        coach.history_for_prompt()[1],
        HistoryEntry::Exchange("User: And tomorrow?".to_owned(), "Coach: Keep it easy.".to_owned())
    );
}

#[tokio::test]
async fn test_sixth_turn_compresses_history() {
    let backends = Backends::new(&decision_json(false, false, false, false, &[]), "Noted.");
    let mut coach = coach_with(&backends, no_evidence()).await;

    for i in 0..6 {
        coach.ask(&format!("question {i}")).await.unwrap();
    }

    assert_eq!(coach.turn_log().len(), 6);
    assert_eq!(coach.session().active_window().len(), 1);
    assert_eq!(coach.session().compressed_summary(), Some("Earlier chat."));
    assert_eq!(backends.summary.call_count(), 1);
}

#[tokio::test]
async fn test_grounding_suffix_only_with_evidence() {
    let backends = Backends::new(&decision_json(false, false, false, true, &[]), "Cadence matters.");
    let checker = StaticFactChecker::new(json!({"results": [{"name": "Heiderscheit 2011"}]}));
    let mut coach = coach_with(&backends, checker.clone()).await;

    coach.ask("Does cadence reduce knee load?").await.unwrap();

    let prompt = backends.answer.last_prompt();
    assert!(prompt.contains(&format!("Does cadence reduce knee load?{GROUNDING_SUFFIX}")));
    assert!(prompt.contains("Heiderscheit 2011"));
    assert_eq!(checker.queries().len(), 1);
}

#[tokio::test]
async fn test_failed_fact_check_still_answers() {
    let backends = Backends::new(&decision_json(false, false, false, true, &[]), "Probably fine.");
    let mut coach = coach_with(&backends, Arc::new(FailingFactChecker)).await;

    let answer = coach.ask("Is heel striking harmful?").await.unwrap();

    assert_eq!(answer, "Probably fine.");
    let prompt = backends.answer.last_prompt();
    assert!(!prompt.contains(GROUNDING_SUFFIX));
    assert!(prompt.contains("could not fact-check"));
}

#[tokio::test]
async fn test_router_failure_records_error_turn() {
    let backends = Backends {
        router: ScriptedProvider::failing("router overloaded"),
        summary: ScriptedProvider::replying("unused"),
        answer: ScriptedProvider::replying("unused"),
    };
    let mut coach = coach_with(&backends, no_evidence()).await;

    let error = coach.ask("How was my run?").await.unwrap_err();

    assert_eq!(error.code, ErrorCode::ExternalServiceError);
    assert_eq!(coach.turn_log().len(), 1);
    let recorded = &coach.turn_log()[0].answer;
    assert!(recorded.starts_with(ERROR_ANSWER_PREFIX));
    assert!(recorded.contains("router overloaded"));
    assert_eq!(backends.answer.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_decision_records_error_turn() {
    let backends = Backends::new("not json", "unused");
    let mut coach = coach_with(&backends, no_evidence()).await;

    let error = coach.ask("How was my run?").await.unwrap_err();

    assert_eq!(error.code, ErrorCode::MalformedDecision);
    assert!(coach.turn_log()[0].answer.starts_with(ERROR_ANSWER_PREFIX));
}

#[tokio::test]
async fn test_streaming_forwards_chunks_and_progress() {
    let backends = Backends::new(
        &decision_json(false, true, false, false, &[97]),
        "Your stride looked balanced",
    );
    let mut coach = coach_with(&backends, no_evidence()).await;
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let progress = ProgressReporter::new(Arc::new(move |update: &ProgressUpdate| {
        sink.lock().unwrap().push(update.stage);
    }));
    let mut chunks = Vec::new();

    let answer = coach
        .ask_streaming(
            "How was my run yesterday?",
            |chunk| chunks.push(chunk.to_owned()),
            &progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(answer, "Your stride looked balanced");
    assert_eq!(chunks, ["Your ", "stride ", "looked ", "balanced"]);
    assert_eq!(coach.turn_log()[0].answer, answer);
    assert!(backends.answer.requests()[0].stream);
    assert_eq!(
        *stages.lock().unwrap(),
        [
            ProgressStage::Analyzing,
            ProgressStage::Fetching,
            ProgressStage::Generating,
            ProgressStage::Done
        ]
    );
}

#[tokio::test]
async fn test_panicking_progress_callback_does_not_abort_turn() {
    let backends = Backends::new(&decision_json(false, false, false, false, &[]), "Easy day.");
    let mut coach = coach_with(&backends, no_evidence()).await;
    let progress = ProgressReporter::new(Arc::new(|_: &ProgressUpdate| {
        panic!("progress sink closed");
    }));

    let answer = coach
        .ask_streaming("Rest today?", |_| {}, &progress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(answer, "Easy day.");
    assert_eq!(coach.turn_log()[0].answer, "Easy day.");
}

#[tokio::test]
async fn test_cancelled_stream_keeps_partial_answer() {
    let backends = Backends::new(&decision_json(false, false, false, false, &[]), "one two three four");
    let mut coach = coach_with(&backends, no_evidence()).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let answer = coach
        .ask_streaming(
            "Tell me something",
            move |_| trigger.cancel(),
            &ProgressReporter::silent(),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(answer, "one ");
    assert_eq!(coach.turn_log()[0].answer, "one ");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let backends = Backends::new("unused", "unused");
    let error = CoachService::for_user(
        common::sample_dependencies(backends.registry(), no_evidence()),
        CoachConfig::default(),
        "Bob",
    )
    .await
    .unwrap_err();

    assert_eq!(error.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_unregistered_model_fails_fast() {
    let registry = ModelRegistry::new().with_model(ModelId::O4Mini, ScriptedProvider::replying("unused"));
    let error = CoachService::for_user(
        common::sample_dependencies(registry, no_evidence()),
        CoachConfig::default(),
        common::SAMPLE_USER,
    )
    .await
    .unwrap_err();

    assert_eq!(error.code, ErrorCode::ConfigMissing);
}
