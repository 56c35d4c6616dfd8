// ABOUTME: Static prompt templates loaded at compile time and the variables used to fill them
// ABOUTME: Templates use `{name}` placeholders with `{{` and `}}` as literal brace escapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Prompt Templates
//!
//! Every prompt the coach sends to a generation backend comes from one of the
//! templates below. They are loaded at compile time from markdown files for
//! easy maintenance and rendered by the [`PromptCompiler`].

mod compiler;

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::errors::AppResult;

pub use compiler::{placeholders, PromptCompiler, RenderOutcome, Rendered};

/// Final coach answer prompt
pub const COACH_TEMPLATE: &str = include_str!("coach.md");

/// Natural-language report over one or more exercise records
pub const RECORD_SUMMARY_TEMPLATE: &str = include_str!("record_summary.md");

/// Compression of evicted conversation turns
pub const SESSION_SUMMARY_TEMPLATE: &str = include_str!("session_summary.md");

/// Retrieval router decision prompt
pub const RETRIEVAL_DECISION_TEMPLATE: &str = include_str!("retrieval_decision.md");

/// Wrapper around the fact-check search query
pub const FACT_CHECK_QUERY_TEMPLATE: &str = include_str!("fact_check_query.md");

/// Identifies one of the static templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateId {
    /// Final answer
    Coach,
    /// Record summary report
    RecordSummary,
    /// Session history compression
    SessionSummary,
    /// Retrieval routing decision
    RetrievalDecision,
    /// Fact-check search query
    FactCheckQuery,
}

impl TemplateId {
    /// All templates
    pub const ALL: [Self; 5] = [
        Self::Coach,
        Self::RecordSummary,
        Self::SessionSummary,
        Self::RetrievalDecision,
        Self::FactCheckQuery,
    ];

    /// Stable name used in logs and errors
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Coach => "coach",
            Self::RecordSummary => "record_summary",
            Self::SessionSummary => "session_summary",
            Self::RetrievalDecision => "retrieval_decision",
            Self::FactCheckQuery => "fact_check_query",
        }
    }

    /// Built-in template text
    #[must_use]
    pub const fn source(&self) -> &'static str {
        match self {
            Self::Coach => COACH_TEMPLATE,
            Self::RecordSummary => RECORD_SUMMARY_TEMPLATE,
            Self::SessionSummary => SESSION_SUMMARY_TEMPLATE,
            Self::RetrievalDecision => RETRIEVAL_DECISION_TEMPLATE,
            Self::FactCheckQuery => FACT_CHECK_QUERY_TEMPLATE,
        }
    }
}

impl Display for TemplateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named values substituted into a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptVars {
    values: BTreeMap<String, String>,
}

impl PromptVars {
    /// Empty variable set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain-text value
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Add a structured value rendered as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` cannot be encoded.
    pub fn json<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> AppResult<Self> {
        self.values
            .insert(name.into(), serde_json::to_string_pretty(value)?);
        Ok(self)
    }

    /// Value for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether `name` has a value
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
