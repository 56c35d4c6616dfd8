// ABOUTME: Configuration management module for the coach pipeline and its collaborators
// ABOUTME: Environment-only settings parsed into typed structs with documented defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module for the Pierre running coach
//!
//! - **Coach**: history window, model routing, answer sampling, retrieval depth
//! - **LLM**: backend API keys, request timeout and retry policy
//! - **Fact-check**: Linkup credentials and search options
//! - **Types**: log level and deployment environment enums

/// Coach, generation-backend and fact-check settings
pub mod coach;
/// Shared configuration enums
pub mod types;

pub use coach::{CoachConfig, FactCheckConfig, LlmConfig};
pub use types::{Environment, LogLevel};
