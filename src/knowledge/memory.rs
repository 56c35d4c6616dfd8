// ABOUTME: In-memory knowledge base ranking chunks by term overlap and bag-of-words cosine
// ABOUTME: Hybrid search fuses both normalised scores, suitable for tests and local use
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{Chunk, KnowledgeBase};
use crate::errors::AppResult;

/// Weight of the semantic score in hybrid fusion; lexical gets the rest
const HYBRID_ALPHA: f64 = 0.5;

/// BM25 term-frequency saturation
const TF_SATURATION: f64 = 1.2;

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn term_counts(tokens: &[String]) -> HashMap<&str, f64> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    counts
}

/// Saturated term frequency weighted by inverse document frequency
fn lexical_scores(query: &[String], documents: &[Vec<String>]) -> Vec<f64> {
    let total = documents.len() as f64;
    let unique_terms: HashSet<&str> = query.iter().map(String::as_str).collect();
    let counts: Vec<HashMap<&str, f64>> = documents.iter().map(|d| term_counts(d)).collect();

    let idf: HashMap<&str, f64> = unique_terms
        .iter()
        .map(|term| {
            let df = counts.iter().filter(|c| c.contains_key(term)).count() as f64;
            (*term, ((total - df + 0.5) / (df + 0.5)).ln_1p())
        })
        .collect();

    counts
        .iter()
        .map(|doc| {
            unique_terms
                .iter()
                .map(|term| {
                    let tf = doc.get(term).copied().unwrap_or(0.0);
                    idf.get(term).copied().unwrap_or(0.0) * tf / (tf + TF_SATURATION)
                })
                .sum()
        })
        .collect()
}

/// Cosine similarity between term-count vectors
fn similarity_scores(query: &[String], documents: &[Vec<String>]) -> Vec<f64> {
    let query_counts = term_counts(query);
    let query_norm = query_counts.values().map(|v| v * v).sum::<f64>().sqrt();

    documents
        .iter()
        .map(|doc| {
            let doc_counts = term_counts(doc);
            let doc_norm = doc_counts.values().map(|v| v * v).sum::<f64>().sqrt();
            if query_norm <= 0.0 || doc_norm <= 0.0 {
                return 0.0;
            }
            let dot: f64 = query_counts
                .iter()
                .filter_map(|(term, q)| doc_counts.get(term).map(|d| q * d))
                .sum();
            dot / (query_norm * doc_norm)
        })
        .collect()
}

/// Scale scores into `0..=1` by the maximum
fn normalize(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| s / max).collect()
}

/// Indices of the `k` best positive scores, ties kept in insertion order
fn top_k(scores: &[f64], k: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] > 0.0).collect();
    ranked.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}

/// Thread-safe chunk store kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    chunks: Arc<RwLock<Vec<Chunk>>>,
}

impl InMemoryKnowledgeBase {
    /// Empty knowledge base
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Knowledge base seeded with `chunks`
    #[must_use]
    pub fn with_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks: Arc::new(RwLock::new(chunks)),
        }
    }

    /// Number of stored chunks
    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    async fn ranked(&self, query: &str, k: usize, alpha: f64) -> Vec<Chunk> {
        if k == 0 {
            return Vec::new();
        }
        let chunks = self.chunks.read().await;
        let query_tokens = tokenize(query);
        let documents: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.content)).collect();

        let semantic = normalize(&similarity_scores(&query_tokens, &documents));
        let lexical = normalize(&lexical_scores(&query_tokens, &documents));
        let fused: Vec<f64> = semantic
            .iter()
            .zip(&lexical)
            .map(|(s, l)| alpha.mul_add(*s, (1.0 - alpha) * l))
            .collect();

        let hits: Vec<Chunk> = top_k(&fused, k)
            .into_iter()
            .filter_map(|i| chunks.get(i).cloned())
            .collect();
        debug!(query, k, hits = hits.len(), "Knowledge base search");
        hits
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    async fn hybrid_search(&self, query: &str, k: usize) -> AppResult<Vec<Chunk>> {
        Ok(self.ranked(query, k, HYBRID_ALPHA).await)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> AppResult<Vec<Chunk>> {
        Ok(self.ranked(query, k, 1.0).await)
    }

    async fn add_items(&self, items: Vec<Chunk>) -> AppResult<()> {
        let mut chunks = self.chunks.write().await;
        for mut item in items {
            if item.id.is_empty() {
                item.id = Uuid::new_v4().to_string();
            }
            if let Some(existing) = chunks.iter_mut().find(|c| c.id == item.id) {
                *existing = item;
            } else {
                chunks.push(item);
            }
        }
        Ok(())
    }

    async fn delete_items(&self, ids: &[String]) -> AppResult<usize> {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|c| !ids.contains(&c.id));
        Ok(before - chunks.len())
    }

    async fn delete_collection(&self) -> AppResult<()> {
        self.chunks.write().await.clear();
        Ok(())
    }
}
