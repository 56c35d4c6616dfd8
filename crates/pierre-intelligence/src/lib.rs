// ABOUTME: Biomechanical summary engine: statistics, aggregation, and record serialization
// ABOUTME: Pure CPU code consumed by the coach's context assembler and record store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Intelligence
//!
//! Turns raw gait-phase measurements into the distributional summaries the
//! coach reasons over.
//!
//! - **statistics**: `summarize` a numeric series into a `MetricSummary`
//! - **aggregation**: merge per-unit `AggregatedSummary` values with the
//!   cumulative shared-counter formula
//! - **exercise_summary**: per-unit, per-body-part summaries of exercise units
//! - **record_detail**: prompt-ready serializations of records and profiles

/// Distributional statistics over numeric series
pub mod statistics;

/// Cumulative merge of aggregated summaries
pub mod aggregation;

/// Per-unit body-part summaries
pub mod exercise_summary;

/// Prompt-ready record and profile serializations
pub mod record_detail;

pub use aggregation::aggregate;
pub use exercise_summary::ExerciseSummarizer;
pub use record_detail::{ProfileDigest, RawRecordData, RecordDetail, UnitDetail};
pub use statistics::summarize;
