// ABOUTME: Per-conversation memory: full turn log, bounded active window, rolling compressed summary
// ABOUTME: Overflowing the window summarises evicted turns through the generation backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use pierre_core::constants::session::RETAINED_TURNS_AFTER_COMPRESSION;
use pierre_core::models::Turn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::strip_code_fences;
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::{PromptCompiler, PromptVars, TemplateId};
use crate::llm::{ChatRequest, ModelId, ModelRegistry};

/// Compression lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting turns
    #[default]
    Active,
    /// Summarising evicted turns
    Compressing,
}

/// One element of the history handed to prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    /// Narrative of compressed turns
    Summary(String),
    /// A retained turn as a `("User: ..", "Coach: ..")` pair
    Exchange(String, String),
}

impl From<&Turn> for HistoryEntry {
    fn from(turn: &Turn) -> Self {
        let (user, coach) = turn.transcript();
        Self::Exchange(user, coach)
    }
}

#[derive(Debug, Deserialize)]
struct ConversationSummary {
    conversation_summary: String,
}

/// Summarises evicted turns with the generation backend
#[derive(Debug, Clone)]
pub struct SessionCompressor {
    registry: Arc<ModelRegistry>,
    compiler: Arc<PromptCompiler>,
    model: ModelId,
}

impl SessionCompressor {
    /// Compressor calling `model` through `registry`
    #[must_use]
    pub const fn new(registry: Arc<ModelRegistry>, compiler: Arc<PromptCompiler>, model: ModelId) -> Self {
        Self {
            registry,
            compiler,
            model,
        }
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": { "conversation_summary": { "type": "string" } },
            "required": ["conversation_summary"],
            "additionalProperties": false
        })
    }

    /// Extract the summary text from backend output
    ///
    /// JSON output yields its `conversation_summary`; anything else is used verbatim.
    fn parse_summary(output: &str) -> Option<String> {
        let body = strip_code_fences(output);
        let text = serde_json::from_str::<ConversationSummary>(body)
            .map_or_else(|_| body.to_owned(), |parsed| parsed.conversation_summary);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_owned())
    }

    /// Write a short narrative of `turns`
    ///
    /// # Errors
    ///
    /// Returns the backend error, or an external-service error for an empty summary.
    #[instrument(skip_all, fields(model = %self.model, turns = turns.len()))]
    pub async fn summarize(&self, turns: &[Turn]) -> AppResult<String> {
        let messages: Vec<HistoryEntry> = turns.iter().map(HistoryEntry::from).collect();
        let vars = PromptVars::new().json("conversation_messages", &messages)?;
        let prompt = self.compiler.render(TemplateId::SessionSummary, &vars)?;

        let request = ChatRequest::from_prompt(prompt)
            .with_json_schema("conversation_summary", Self::schema());
        let response = self.registry.complete(self.model, request).await?;

        Self::parse_summary(&response.content).ok_or_else(|| {
            AppError::external_service(self.model.as_str(), "returned an empty conversation summary")
        })
    }
}

/// Conversation memory for one chat session
#[derive(Debug)]
pub struct SessionManager {
    turn_log: Vec<Turn>,
    active_window: Vec<Turn>,
    compressed_summary: Option<String>,
    history_threshold: usize,
    state: SessionState,
    compressor: SessionCompressor,
}

impl SessionManager {
    /// Empty session compressing once the window exceeds `history_threshold`
    #[must_use]
    pub const fn new(history_threshold: usize, compressor: SessionCompressor) -> Self {
        Self {
            turn_log: Vec::new(),
            active_window: Vec::new(),
            compressed_summary: None,
            history_threshold,
            state: SessionState::Active,
            compressor,
        }
    }

    /// Append a turn to the log and the window, compressing on overflow
    ///
    /// The turn is recorded even when compression fails; the window then
    /// stays uncompressed until the next successful attempt.
    ///
    /// # Errors
    ///
    /// Returns the compression error.
    pub async fn record_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) -> AppResult<()> {
        let turn = Turn::new(question, answer);
        self.turn_log.push(turn.clone());
        self.active_window.push(turn);
        debug!(
            logged = self.turn_log.len(),
            window = self.active_window.len(),
            "Turn recorded"
        );

        if self.active_window.len() > self.history_threshold {
            self.compress().await?;
        }
        Ok(())
    }

    /// Summarise every window turn except the most recent into the rolling summary
    ///
    /// # Errors
    ///
    /// Returns the backend error; the window and summary are left unchanged.
    pub async fn compress(&mut self) -> AppResult<()> {
        let evict = self
            .active_window
            .len()
            .saturating_sub(RETAINED_TURNS_AFTER_COMPRESSION);
        if evict == 0 {
            return Ok(());
        }

        self.state = SessionState::Compressing;
        let result = self.compressor.summarize(&self.active_window[..evict]).await;
        self.state = SessionState::Active;

        let summary = result.inspect_err(|e| {
            warn!(error = %e, window = self.active_window.len(), "Session compression failed, keeping window");
        })?;

        self.compressed_summary = Some(match self.compressed_summary.take() {
            Some(previous) => format!("{previous}\n{summary}"),
            None => summary,
        });
        self.active_window.drain(..evict);
        info!(
            evicted = evict,
            summary_chars = self.compressed_summary.as_ref().map_or(0, String::len),
            "Session history compressed"
        );
        Ok(())
    }

    /// `[compressed summary] + active window`, or the window alone before any compression
    #[must_use]
    pub fn history_for_prompt(&self) -> Vec<HistoryEntry> {
        self.compressed_summary
            .iter()
            .map(|summary| HistoryEntry::Summary(summary.clone()))
            .chain(self.active_window.iter().map(HistoryEntry::from))
            .collect()
    }

    /// Every turn of the session, oldest first
    #[must_use]
    pub fn turn_log(&self) -> &[Turn] {
        &self.turn_log
    }

    /// Turns not yet compressed
    #[must_use]
    pub fn active_window(&self) -> &[Turn] {
        &self.active_window
    }

    /// Rolling narrative of compressed turns
    #[must_use]
    pub fn compressed_summary(&self) -> Option<&str> {
        self.compressed_summary.as_deref()
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Window length that triggers compression when exceeded
    #[must_use]
    pub const fn history_threshold(&self) -> usize {
        self.history_threshold
    }
}
