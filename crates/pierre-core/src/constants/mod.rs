// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Statistics precision, session defaults, retrieval limits, and service names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single
//! large file.

/// Statistical summary constants
pub mod statistics {
    /// Decimal places every summary statistic is rounded to
    pub const SUMMARY_PRECISION: i32 = 4;
    /// First quartile percentile
    pub const Q1_PERCENTILE: f64 = 25.0;
    /// Median percentile
    pub const MEDIAN_PERCENTILE: f64 = 50.0;
    /// Third quartile percentile
    pub const Q3_PERCENTILE: f64 = 75.0;
}

/// Conversation session defaults
pub mod session {
    /// Number of turns the active window may hold before compression
    pub const DEFAULT_HISTORY_THRESHOLD: usize = 5;
    /// Turns kept in the active window after compression
    pub const RETAINED_TURNS_AFTER_COMPRESSION: usize = 1;
    /// Prefix used when rendering a question into a transcript
    pub const USER_PREFIX: &str = "User: ";
    /// Prefix used when rendering an answer into a transcript
    pub const COACH_PREFIX: &str = "Coach: ";
    /// Prefix of the answer recorded for a failed turn
    pub const ERROR_ANSWER_PREFIX: &str = "Sorry, I couldn't complete that request: ";
}

/// Retrieval defaults
pub mod retrieval {
    /// Default number of knowledge-base chunks returned by a hybrid search
    pub const DEFAULT_KB_TOP_K: usize = 5;
    /// Characters of a query echoed back in progress messages
    pub const PROGRESS_QUERY_PREVIEW_CHARS: usize = 50;
    /// Fallback text placed in the bundle when fact-checking fails
    pub const FACT_CHECK_FALLBACK: &str = "could not fact-check";
    /// Instruction appended to the question when fact-check evidence is present
    pub const GROUNDING_SUFFIX: &str = " Ground your advice and analysis using the provided `fact_checking_data` containing scientific literature search results.";
}

/// Generation defaults
pub mod generation {
    /// Default sampling temperature for the final answer
    pub const DEFAULT_ANSWER_TEMPERATURE: f32 = 1.0;
    /// Default timeout of a blocking generation call in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
    /// Longest silence tolerated between two reads of a response body in seconds
    pub const STREAM_READ_TIMEOUT_SECS: u64 = 60;
    /// Connect timeout for generation backends in seconds
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;
}

/// Service names used in logs and error messages
pub mod service_names {
    /// Service name reported at logging start-up
    pub const PIERRE_COACH: &str = "pierre-coach";
    /// Google Gemini backend
    pub const GEMINI: &str = "Gemini";
    /// `OpenAI` backend
    pub const OPENAI: &str = "OpenAI";
    /// Anthropic backend
    pub const ANTHROPIC: &str = "Anthropic";
    /// Linkup web search
    pub const LINKUP: &str = "Linkup";
    /// Knowledge base
    pub const KNOWLEDGE_BASE: &str = "KnowledgeBase";
    /// Record store
    pub const RECORD_STORE: &str = "RecordStore";
}
