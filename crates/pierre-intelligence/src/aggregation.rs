// ABOUTME: Cumulative merge of per-unit aggregated summaries into one rollup
// ABOUTME: Preserves the shared-counter running average used by the coach's historical data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Summary Aggregation
//!
//! Merges a sequence of [`AggregatedSummary`] values key by key
//! (body part → side → metric → statistic).
//!
//! The first summary to mention a key contributes its value unchanged. Every
//! later occurrence is folded in with
//!
//! ```text
//! updated = (previous * count + new) / (count + 1)
//! ```
//!
//! where `count` starts at 1 **once per call** and is incremented after every
//! statistic merged, across all body parts, sides and metrics. Earlier values
//! therefore lose weight faster than in a true running mean, and the result
//! depends on input order. This matches the summaries already stored for
//! existing users, so the formula is kept as-is.
//!
//! Traversal order is fixed: body parts in descriptor order, left before
//! right, metrics in the body part's declared column order (undeclared columns
//! after, alphabetically), statistics `min, q1, median, q3, max, mean, std`.

use pierre_core::models::{
    AggregatedSummary, BodyPart, MetricStatistic, MetricSummary, MetricTable, SideTable,
};

use crate::statistics::round_summary_value;

/// Metric names of `table` in traversal order
fn ordered_metrics(part: BodyPart, table: &MetricTable) -> Vec<&str> {
    let declared = part
        .metrics()
        .iter()
        .copied()
        .filter(|metric| table.contains_key(*metric));
    let undeclared = table
        .keys()
        .map(String::as_str)
        .filter(|metric| !part.has_metric(metric));
    declared.chain(undeclared).collect()
}

/// Fold `incoming` into `current`, advancing the shared counter per statistic
fn merge_metric(current: &mut MetricSummary, incoming: &MetricSummary, count: &mut f64) {
    for statistic in MetricStatistic::ALL {
        let previous = current.get(statistic);
        *current.get_mut(statistic) =
            previous.mul_add(*count, incoming.get(statistic)) / (*count + 1.0);
        *count += 1.0;
    }
}

fn merge_sides(part: BodyPart, current: &mut SideTable, incoming: &SideTable, count: &mut f64) {
    for (side, incoming_metrics) in incoming {
        let Some(current_metrics) = current.get_mut(side) else {
            current.insert(*side, incoming_metrics.clone());
            continue;
        };
        for metric in ordered_metrics(part, incoming_metrics) {
            let Some(incoming_summary) = incoming_metrics.get(metric) else {
                continue;
            };
            match current_metrics.get_mut(metric) {
                Some(current_summary) => merge_metric(current_summary, incoming_summary, count),
                None => {
                    current_metrics.insert(metric.to_owned(), *incoming_summary);
                }
            }
        }
    }
}

/// Merge a sequence of summaries into one, then round every value to four decimals
///
/// Returns an empty rollup for an empty input.
#[must_use]
pub fn aggregate(summaries: &[AggregatedSummary]) -> AggregatedSummary {
    let mut result = AggregatedSummary::new();
    let mut count = 1.0_f64;

    for summary in summaries {
        for (part, sides) in &summary.body_parts {
            match result.body_parts.get_mut(part) {
                Some(current) => merge_sides(*part, current, sides, &mut count),
                None => {
                    result.body_parts.insert(*part, sides.clone());
                }
            }
        }
    }

    for sides in result.body_parts.values_mut() {
        for metrics in sides.values_mut() {
            for summary in metrics.values_mut() {
                *summary = summary.map(round_summary_value);
            }
        }
    }

    result
}
