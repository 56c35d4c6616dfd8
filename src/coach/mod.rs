// ABOUTME: Conversation orchestration pipeline for the running coach
// ABOUTME: Router, context assembler, session memory, progress reporting and the coach facade
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Coach pipeline
//!
//! One turn runs strictly in order:
//!
//! 1. [`RetrievalRouter`] asks the router model which context sources the question needs
//! 2. [`ContextAssembler`] runs the selected lookups concurrently into a [`ContextBundle`]
//! 3. the prompt compiler renders the coach template
//! 4. the answer model generates (blocking or streamed)
//! 5. [`SessionManager`] records the turn, compressing history on overflow

/// Concurrent execution of the selected context lookups
pub mod assembler;
/// The `CoachService` facade
pub mod orchestrator;
/// Progress stages and callback delivery
pub mod progress;
/// Retrieval decision and router
pub mod router;
/// Turn log, active window and compressed summary
pub mod session;

pub use assembler::{ContextAssembler, ContextBundle, FactCheckData};
pub use orchestrator::{CoachDependencies, CoachService};
pub use progress::{ProgressCallback, ProgressReporter, ProgressStage, ProgressUpdate};
pub use router::{RetrievalDecision, RetrievalRouter};
pub use session::{HistoryEntry, SessionCompressor, SessionManager, SessionState};

/// Strip a surrounding markdown code fence (```` ```json ... ``` ````) from model output
pub(crate) fn strip_code_fences(output: &str) -> &str {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
