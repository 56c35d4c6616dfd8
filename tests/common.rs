// ABOUTME: Shared test utilities for the coach integration tests
// ABOUTME: Scripted generation backends, stub collaborators and sample profile/record fixtures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    missing_docs,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `pierre_coach`

use std::collections::VecDeque;
use std::env;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use futures_util::stream;
use pierre_coach::coach::CoachDependencies;
use pierre_coach::config::LogLevel;
use pierre_coach::errors::{AppError, AppResult};
use pierre_coach::grounding::FactChecker;
use pierre_coach::knowledge::{Chunk, InMemoryKnowledgeBase};
use pierre_coach::llm::{
    ChatRequest, ChatResponse, ChatStream, LlmCapabilities, LlmProvider, ModelId, ModelRegistry,
    StreamChunk,
};
use pierre_coach::storage::{InMemoryRecordStore, UserAccount};
use pierre_core::models::{ActivityKind, BodyPart, ExerciseRecord, ExerciseUnit, GaitPhase, Side};
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = env::var("TEST_LOG")
            .map_or(LogLevel::Warn, |level| LogLevel::from_str_or_default(&level))
            .to_tracing_level();

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Scripted generation backend
// ============================================================================

type Responder = dyn Fn(&ChatRequest) -> AppResult<String> + Send + Sync;

/// Backend answering from a closure and recording every request
pub struct ScriptedProvider {
    responder: Box<Responder>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(responder: impl Fn(&ChatRequest) -> AppResult<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always returns `reply`
    pub fn replying(reply: &str) -> Arc<Self> {
        let reply = reply.to_owned();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Returns `replies` in order, then fails
    pub fn sequence(replies: &[&str]) -> Arc<Self> {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(replies.iter().map(|r| (*r).to_owned()).collect());
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::external_service("Scripted", "script exhausted"))
        })
    }

    /// Always fails with an external-service error
    pub fn failing(message: &str) -> Arc<Self> {
        let message = message.to_owned();
        Self::new(move |_| Err(AppError::external_service("Scripted", message.clone())))
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Text of the last prompt sent
    pub fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|request| request.messages.last())
            .map(|message| message.content.clone())
            .unwrap_or_default()
    }

    fn respond(&self, request: &ChatRequest) -> AppResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn display_name(&self) -> &'static str {
        "Scripted Test Backend"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn available_models(&self) -> &'static [&'static str] {
        &["scripted-model"]
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let content = self.respond(request)?;
        Ok(ChatResponse {
            content,
            model: request.model.clone().unwrap_or_default(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    /// Streams the reply word by word
    async fn complete_stream(&self, request: &ChatRequest) -> AppResult<ChatStream> {
        let content = self.respond(request)?;
        let mut chunks: Vec<AppResult<StreamChunk>> = content
            .split_inclusive(' ')
            .map(|word| Ok(StreamChunk::text(word)))
            .collect();
        chunks.push(Ok(StreamChunk::done("stop")));
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Registry wiring the default router, summary and answer models to separate backends
pub fn registry_with(
    router: Arc<ScriptedProvider>,
    summary: Arc<ScriptedProvider>,
    answer: Arc<ScriptedProvider>,
) -> ModelRegistry {
    ModelRegistry::new()
        .with_model(ModelId::O4Mini, router)
        .with_model(ModelId::Gemini20Flash, summary)
        .with_model(ModelId::Gemini25FlashPreview, answer)
}

/// Router output in the backend's wire shape
pub fn decision_json(
    knowledge_base: bool,
    raw: bool,
    summary: bool,
    fact_check: bool,
    run_ids: &[u64],
) -> String {
    json!({
        "QueryKnowledgeBase_needed": knowledge_base,
        "GetRawRunData_needed": raw,
        "GenerateRunSummary_needed": summary,
        "GetGroundingAndFactCheckingData_needed": fact_check,
        "query": if knowledge_base { "cadence and overstriding" } else { "" },
        "fact_checking_query": if fact_check { "does higher cadence reduce knee load" } else { "" },
        "run_ids": run_ids,
    })
    .to_string()
}

// ============================================================================
// Stub collaborators
// ============================================================================

/// Fact checker returning a fixed payload and remembering queries
#[derive(Default)]
pub struct StaticFactChecker {
    payload: Value,
    queries: Mutex<Vec<String>>,
}

impl StaticFactChecker {
    pub fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl FactChecker for StaticFactChecker {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn search(&self, query: &str) -> AppResult<Value> {
        self.queries.lock().unwrap().push(query.to_owned());
        Ok(self.payload.clone())
    }
}

/// Fact checker whose every search fails
pub struct FailingFactChecker;

#[async_trait]
impl FactChecker for FailingFactChecker {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn search(&self, _query: &str) -> AppResult<Value> {
        Err(AppError::collaborator_unavailable("Linkup", "connection reset"))
    }
}

pub fn sample_knowledge_base() -> InMemoryKnowledgeBase {
    InMemoryKnowledgeBase::with_chunks(vec![
        Chunk::new("c1", "Increasing cadence by five percent reduces overstriding and knee load"),
        Chunk::new("c2", "Tapering before a marathon lowers volume while keeping intensity"),
        Chunk::new("c3", "Hip flexion range relates to stride length in distance running"),
    ])
}

// ============================================================================
// Profile and record fixtures
// ============================================================================

pub const SAMPLE_USER: &str = "Alice";
pub const SAMPLE_USER_ID: u64 = 1;

pub fn yesterday() -> NaiveDate {
    Local::now().date_naive() - Duration::days(1)
}

/// One unit with knee angles for both sides
pub fn sample_unit(speed: f64, knee: &[f64]) -> ExerciseUnit {
    let phases = knee
        .iter()
        .enumerate()
        .map(|(i, angle)| {
            GaitPhase::new(i as f64 / knee.len().max(1) as f64)
                .unwrap()
                .with_measurement(BodyPart::Knee, Side::Left, "angle_avg", *angle)
                .with_measurement(BodyPart::Knee, Side::Right, "angle_avg", angle + 1.0)
        })
        .collect();
    ExerciseUnit::new(speed, phases)
}

pub fn sample_record(id: u64, date: NaiveDate) -> ExerciseRecord {
    ExerciseRecord {
        id,
        user_id: SAMPLE_USER_ID,
        kind: ActivityKind::Run,
        date,
        units: vec![
            sample_unit(3.1, &[10.0, 20.0, 30.0]),
            sample_unit(3.4, &[12.0, 22.0, 32.0]),
        ],
    }
}

pub fn sample_account() -> UserAccount {
    UserAccount {
        id: SAMPLE_USER_ID,
        name: SAMPLE_USER.to_owned(),
        height: 170.0,
        weight: 62.5,
    }
}

/// Store with Alice and one run recorded yesterday (id 97)
pub fn sample_store() -> InMemoryRecordStore {
    InMemoryRecordStore::new()
        .with_user(sample_account())
        .with_record(sample_record(97, yesterday()))
}

/// Dependencies over the sample store and knowledge base
pub fn sample_dependencies(
    registry: ModelRegistry,
    fact_checker: Arc<dyn FactChecker>,
) -> CoachDependencies {
    CoachDependencies {
        registry: Arc::new(registry),
        knowledge_base: Arc::new(sample_knowledge_base()),
        fact_checker,
        record_store: Arc::new(sample_store()),
    }
}
