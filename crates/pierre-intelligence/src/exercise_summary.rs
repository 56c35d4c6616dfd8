// ABOUTME: Per-unit, per-body-part summaries of gait phase measurements
// ABOUTME: Walks the static body-part descriptor table instead of resolving types by name
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::errors::AppResult;
use pierre_core::models::{AggregatedSummary, BodyPart, ExerciseUnit, Side};
use rayon::prelude::*;
use tracing::debug;

use crate::aggregation::aggregate;
use crate::statistics::summarize;

/// Summarises exercise units over a fixed set of body parts
#[derive(Debug, Clone)]
pub struct ExerciseSummarizer {
    body_parts: Vec<BodyPart>,
}

impl Default for ExerciseSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExerciseSummarizer {
    /// Summariser over the joint body parts (`BodyPart::SUMMARIZED`)
    #[must_use]
    pub fn new() -> Self {
        Self {
            body_parts: BodyPart::SUMMARIZED.to_vec(),
        }
    }

    /// Summariser over an explicit body-part list, in the given order
    #[must_use]
    pub fn with_body_parts(body_parts: &[BodyPart]) -> Self {
        Self {
            body_parts: body_parts.to_vec(),
        }
    }

    /// Body parts covered, in summary order
    #[must_use]
    pub fn body_parts(&self) -> &[BodyPart] {
        &self.body_parts
    }

    /// Summary of one body part within one unit
    ///
    /// Metrics without samples on a side are left out rather than summarised,
    /// so `summarize` is never asked for an empty series. Returns `None` when
    /// the unit carries no samples for the body part at all.
    fn summarize_body_part(
        unit: &ExerciseUnit,
        part: BodyPart,
    ) -> AppResult<Option<AggregatedSummary>> {
        let mut summary = AggregatedSummary::new();
        for side in Side::BOTH {
            for metric in part.metrics() {
                let series = unit.series(part, side, metric);
                if series.is_empty() {
                    debug!(body_part = %part, side = %side, metric, "No samples for metric");
                    continue;
                }
                summary.insert(part, side, *metric, summarize(&series)?);
            }
        }
        Ok((!summary.is_empty()).then_some(summary))
    }

    fn summaries_for_unit(&self, unit: &ExerciseUnit) -> AppResult<Vec<AggregatedSummary>> {
        let mut summaries = Vec::with_capacity(self.body_parts.len());
        for part in &self.body_parts {
            if let Some(summary) = Self::summarize_body_part(unit, *part)? {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    /// One summary per (unit, body part), unit-major
    ///
    /// Units are summarised in parallel; output order matches input order.
    ///
    /// # Errors
    ///
    /// Propagates statistics errors.
    pub fn unit_summaries(&self, units: &[&ExerciseUnit]) -> AppResult<Vec<AggregatedSummary>> {
        let per_unit = units
            .par_iter()
            .map(|unit| self.summaries_for_unit(unit))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(per_unit.into_iter().flatten().collect())
    }

    /// Aggregate of every unit's body-part summaries
    ///
    /// # Errors
    ///
    /// Propagates statistics errors.
    pub fn summarize_units(&self, units: &[&ExerciseUnit]) -> AppResult<AggregatedSummary> {
        Ok(aggregate(&self.unit_summaries(units)?))
    }
}
