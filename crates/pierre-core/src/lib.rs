// ABOUTME: Core types and constants for the Pierre running coach
// ABOUTME: Foundation crate with error handling, biomechanical data model, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Core
//!
//! Foundation crate providing shared types and constants for the Pierre running
//! coach. This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode` and `AppResult`
//! - **constants**: Coach pipeline defaults organized by domain
//! - **models**: User profiles, exercise records, gait phases and metric summaries

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (profiles, exercise records, body-part descriptors, summaries)
pub mod models;
