// ABOUTME: Core data models for the Pierre running coach
// ABOUTME: Re-exports profiles, exercise records, body-part descriptors, summaries, and turns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Ownership is strictly hierarchical:
//! `ExerciseRecord` → `ExerciseUnit` → `GaitPhase` → per-body-part left/right rows.
//!
//! ## Core Models
//!
//! - `UserProfile`: identity, biometrics, performance rollup and record references
//! - `ExerciseRecord`: one logged activity with its ordered units
//! - `BodyPart` / `Side`: the static descriptor table of measured body parts
//! - `MetricSummary` / `AggregatedSummary`: distributional summaries
//! - `Turn`: one question/answer exchange

mod body_part;
mod conversation;
mod exercise;
mod profile;
mod summary;

pub use body_part::{BodyPart, Side};
pub use conversation::Turn;
pub use exercise::{
    ActivityKind, BodyPartMeasurement, ExerciseRecord, ExerciseUnit, GaitPhase, Measurements,
};
pub use profile::{RecordRef, UserProfile};
pub use summary::{AggregatedSummary, MetricStatistic, MetricSummary, MetricTable, SideTable};
