// ABOUTME: Re-exports the unified error types from pierre-core for use across the coach crate
// ABOUTME: Keeps `crate::errors::AppError` paths stable for every module
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! The error taxonomy lives in `pierre_core::errors`; this module re-exports it
//! so pipeline code imports errors from one place.

pub use pierre_core::errors::{AppError, AppResult, ErrorCode, ErrorContext};
