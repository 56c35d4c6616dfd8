// ABOUTME: Pipeline progress stages and the callback wrapper that reports them
// ABOUTME: A panicking callback is caught and logged so UI feedback never aborts a turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use pierre_core::constants::retrieval::PROGRESS_QUERY_PREVIEW_CHARS;
use serde::Serialize;
use tracing::{debug, warn};

/// Pipeline stage a progress message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// Routing the question
    Analyzing,
    /// Knowledge-base or fact-check search
    Searching,
    /// Loading or summarising exercise records
    Fetching,
    /// Writing the final answer
    Generating,
    /// Turn finished
    Done,
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// Stage
    pub stage: ProgressStage,
    /// Human-readable status line
    pub message: String,
}

impl ProgressUpdate {
    /// Create an update
    #[must_use]
    pub fn new(stage: ProgressStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Routing has started
    #[must_use]
    pub fn analyzing() -> Self {
        Self::new(
            ProgressStage::Analyzing,
            "Analyzing your query to determine next steps...",
        )
    }

    /// Knowledge-base search for `query`
    #[must_use]
    pub fn searching_knowledge_base(query: &str) -> Self {
        Self::new(
            ProgressStage::Searching,
            format!("Searching knowledge base for: '{}...'", preview(query)),
        )
    }

    /// Fact-check search for `query`
    #[must_use]
    pub fn fact_checking(query: &str) -> Self {
        Self::new(
            ProgressStage::Searching,
            format!(
                "Fact-checking output with academic sources using the search term: '{}...'",
                preview(query)
            ),
        )
    }

    /// Fact-check search failed and was replaced by the fallback payload
    #[must_use]
    pub fn fact_check_failed() -> Self {
        Self::new(
            ProgressStage::Searching,
            "Fact-checking output with online academic sources failed.",
        )
    }

    /// Raw record fetch
    #[must_use]
    pub fn fetching_records(ids: &[u64]) -> Self {
        Self::new(
            ProgressStage::Fetching,
            format!("Fetching performance records for run(s): {ids:?}..."),
        )
    }

    /// Record summary generation
    #[must_use]
    pub fn summarizing_records(ids: &[u64]) -> Self {
        Self::new(
            ProgressStage::Fetching,
            format!("Generating summary for run(s): {ids:?}..."),
        )
    }

    /// Context gathered, answer generation starting
    #[must_use]
    pub fn generating() -> Self {
        Self::new(ProgressStage::Generating, "Consolidating information...")
    }

    /// Turn complete
    #[must_use]
    pub fn done() -> Self {
        Self::new(ProgressStage::Done, "Done.")
    }
}

/// First characters of `query` shown in status lines
fn preview(query: &str) -> String {
    query.chars().take(PROGRESS_QUERY_PREVIEW_CHARS).collect()
}

/// Progress callback supplied by the hosting UI
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Delivers progress updates to an optional callback
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    /// Reporter forwarding to `callback`
    #[must_use]
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Reporter that only logs
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Reporter from an optional callback
    #[must_use]
    pub fn from_option(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    /// Deliver `update`; a panicking callback is logged and ignored
    pub fn report(&self, update: &ProgressUpdate) {
        debug!(stage = ?update.stage, message = %update.message, "Progress");
        let Some(callback) = &self.callback else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(update))).is_err() {
            warn!(stage = ?update.stage, "Progress callback panicked, continuing");
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
