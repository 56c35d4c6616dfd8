// ABOUTME: Main library entry point for the Pierre running coach
// ABOUTME: Conversation orchestration over biomechanical records, a knowledge base and LLM backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy.
#![deny(unsafe_code)]

//! # Pierre Coach
//!
//! An AI running coach that answers free-form questions about a user's
//! running biomechanics with data-grounded advice.
//!
//! ## Features
//!
//! - **Retrieval routing**: one structured-output call decides which context a question needs
//! - **Concurrent context assembly**: knowledge-base search, record data or summaries,
//!   and scientific fact-checking
//! - **Bounded session memory**: old turns are compressed into a rolling summary
//! - **Multiple backends**: Gemini, `OpenAI` and Anthropic behind one model registry
//! - **Streaming answers** with progress reporting and cancellation
//!
//! ## Architecture
//!
//! - **coach**: router, assembler, session manager and the `CoachService` facade
//! - **llm**: generation backends, model registry and prompt templates
//! - **knowledge** / **grounding** / **storage**: collaborator traits and implementations
//! - **config** / **logging** / **errors**: ambient infrastructure
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pierre_coach::coach::{CoachDependencies, CoachService};
//! use pierre_coach::config::{CoachConfig, FactCheckConfig, LlmConfig};
//! use pierre_coach::errors::AppResult;
//! use pierre_coach::knowledge::InMemoryKnowledgeBase;
//! use pierre_coach::storage::InMemoryRecordStore;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let store = InMemoryRecordStore::load_json("data/records.json").await?;
//!     let deps = CoachDependencies::from_config(
//!         &LlmConfig::from_env()?,
//!         &FactCheckConfig::from_env(),
//!         Arc::new(InMemoryKnowledgeBase::new()),
//!         Arc::new(store),
//!     )?;
//!     let mut coach = CoachService::for_user(deps, CoachConfig::from_env()?, "Alice").await?;
//!     let answer = coach.ask("How was my run yesterday?").await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

/// Conversation orchestration pipeline
pub mod coach;

/// Environment-driven configuration
pub mod config;

/// Unified error types re-exported from `pierre-core`
pub mod errors;

/// External evidence search for fact-checking
pub mod grounding;

/// Knowledge-base abstraction, in-memory index and text cleaning
pub mod knowledge;

/// Generation backends, model registry and prompt templates
pub mod llm;

/// Structured logging setup
pub mod logging;

/// User profiles and exercise records
pub mod storage;
