// ABOUTME: Knowledge-base abstraction for sports-science reference text
// ABOUTME: Hybrid and similarity search over chunks, plus ingestion and deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// In-memory knowledge base with lexical and bag-of-words ranking
pub mod memory;
/// Cleaning helpers applied to book text before ingestion
pub mod text_cleaning;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;

pub use memory::InMemoryKnowledgeBase;

/// A unit of retrievable text with a stable identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier
    pub id: String,
    /// Text content
    pub content: String,
}

impl Chunk {
    /// Create a chunk
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Searchable store of reference chunks
///
/// Implementations hold no per-session state and are shared by every
/// conversation.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Rank chunks by fused semantic and lexical relevance, best first
    ///
    /// # Errors
    ///
    /// Returns an error if the backing index cannot be queried.
    async fn hybrid_search(&self, query: &str, k: usize) -> AppResult<Vec<Chunk>>;

    /// Rank chunks by semantic similarity only, best first
    ///
    /// # Errors
    ///
    /// Returns an error if the backing index cannot be queried.
    async fn similarity_search(&self, query: &str, k: usize) -> AppResult<Vec<Chunk>>;

    /// Insert chunks, replacing any with the same id
    ///
    /// # Errors
    ///
    /// Returns an error if the backing index rejects the write.
    async fn add_items(&self, chunks: Vec<Chunk>) -> AppResult<()>;

    /// Remove chunks by id, returning how many existed
    ///
    /// # Errors
    ///
    /// Returns an error if the backing index rejects the delete.
    async fn delete_items(&self, ids: &[String]) -> AppResult<usize>;

    /// Remove every chunk
    ///
    /// # Errors
    ///
    /// Returns an error if the backing index rejects the delete.
    async fn delete_collection(&self) -> AppResult<()>;
}
