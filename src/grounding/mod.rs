// ABOUTME: Fact-checking abstraction backed by external scientific literature search
// ABOUTME: Returns the search payload as JSON; callers decide how to degrade on failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Linkup web search client restricted to academic sources
pub mod linkup;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{AppError, AppResult, ErrorCode};

pub use linkup::LinkupFactChecker;

/// Searches external evidence for a fact-check query
#[async_trait]
pub trait FactChecker: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Search for evidence, returning the raw result payload
    ///
    /// # Errors
    ///
    /// Returns a collaborator error if the search service fails.
    async fn search(&self, query: &str) -> AppResult<Value>;
}

/// Stand-in used when no search service is configured; every search fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredFactChecker;

#[async_trait]
impl FactChecker for UnconfiguredFactChecker {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn search(&self, _query: &str) -> AppResult<Value> {
        Err(AppError::new(
            ErrorCode::ConfigMissing,
            "fact-checking service is not configured",
        ))
    }
}
