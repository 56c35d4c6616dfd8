// ABOUTME: Integration tests for the knowledge base and book-text cleaning
// ABOUTME: Hybrid and semantic ranking, item maintenance, CSS and caption stripping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

mod common;

use pierre_coach::knowledge::text_cleaning::{
    clean_knowledge_text, prepare_chunks, remove_css_styles, remove_figure_references,
};
use pierre_coach::knowledge::{Chunk, InMemoryKnowledgeBase, KnowledgeBase};

// ============================================================================
// Text cleaning
// ============================================================================

#[test]
fn test_css_rules_and_selectors_removed() {
    assert_eq!(
        remove_css_styles("p { color: red; }\nStrength work helps"),
        "Strength work helps"
    );
}

#[test]
fn test_figure_captions_removed() {
    let text = "Hip drop increases load\nFigure 12: Pelvis tilt during stance\nStrengthen glutes";
    assert_eq!(
        remove_figure_references(text),
        "Hip drop increases load\n\nStrengthen glutes"
    );
}

#[test]
fn test_full_cleaning_pass() {
    let text = "Running form matters. Cadence, stride.\nFigure 3: Knee angle over stride\n\n\nLand softly";
    assert_eq!(
        clean_knowledge_text(text),
        "Running form matters Cadence stride\n\nLand softly"
    );
}

#[test]
fn test_prepare_chunks_drops_empty_passages() {
    let chunks = prepare_chunks(["Cadence.", "{ margin: 0 }", "div"]);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "Cadence");
    assert_eq!(chunks[0].id.len(), 36);
}

// ============================================================================
// In-memory knowledge base
// ============================================================================

#[tokio::test]
async fn test_hybrid_search_ranks_best_match_first() {
    let kb = common::sample_knowledge_base();

    let hits = kb.hybrid_search("marathon taper volume", 2).await.unwrap();

    assert_eq!(hits[0].id, "c2");
    assert!(hits.iter().all(|chunk| chunk.id != "c1"));
}

#[tokio::test]
async fn test_unrelated_query_finds_nothing() {
    let kb = common::sample_knowledge_base();
    assert!(kb.hybrid_search("swimming goggles", 5).await.unwrap().is_empty());
    assert!(kb.similarity_search("cadence", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_similarity_search_uses_term_overlap() {
    let kb = common::sample_knowledge_base();

    let hits = kb.similarity_search("hip flexion stride", 3).await.unwrap();

    assert_eq!(hits[0].id, "c3");
}

#[tokio::test]
async fn test_items_added_replaced_and_deleted() {
    let kb = InMemoryKnowledgeBase::new();
    assert!(kb.is_empty().await);

    kb.add_items(vec![Chunk::new("a", "tempo runs"), Chunk::new("", "long runs")])
        .await
        .unwrap();
    kb.add_items(vec![Chunk::new("a", "threshold tempo runs")])
        .await
        .unwrap();
    assert_eq!(kb.len().await, 2);

    let hits = kb.hybrid_search("threshold", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "threshold tempo runs");

    let removed = kb
        .delete_items(&["a".to_owned(), "missing".to_owned()])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(kb.len().await, 1);

    kb.delete_collection().await.unwrap();
    assert!(kb.is_empty().await);
}
