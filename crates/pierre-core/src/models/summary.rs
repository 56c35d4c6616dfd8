// ABOUTME: Distributional metric summaries and their body-part/side/metric rollup
// ABOUTME: Pure data types; computation lives in the intelligence crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::body_part::{BodyPart, Side};

/// One of the seven statistics carried by a [`MetricSummary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatistic {
    /// Minimum value
    Min,
    /// First quartile
    Q1,
    /// Median
    Median,
    /// Third quartile
    Q3,
    /// Maximum value
    Max,
    /// Arithmetic mean
    Mean,
    /// Population standard deviation
    Std,
}

impl MetricStatistic {
    /// Statistics in the order they are produced and merged
    pub const ALL: [Self; 7] = [
        Self::Min,
        Self::Q1,
        Self::Median,
        Self::Q3,
        Self::Max,
        Self::Mean,
        Self::Std,
    ];
}

/// Distributional summary of a numeric series
///
/// Values are rounded to four decimal places. For any summary produced from
/// data, `min <= q1 <= median <= q3 <= max` holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Minimum value
    pub min: f64,
    /// First quartile (25th percentile)
    pub q1: f64,
    /// Median (50th percentile)
    pub median: f64,
    /// Third quartile (75th percentile)
    pub q3: f64,
    /// Maximum value
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
}

impl MetricSummary {
    /// Read one statistic
    #[must_use]
    pub const fn get(&self, statistic: MetricStatistic) -> f64 {
        match statistic {
            MetricStatistic::Min => self.min,
            MetricStatistic::Q1 => self.q1,
            MetricStatistic::Median => self.median,
            MetricStatistic::Q3 => self.q3,
            MetricStatistic::Max => self.max,
            MetricStatistic::Mean => self.mean,
            MetricStatistic::Std => self.std,
        }
    }

    /// Mutable access to one statistic
    pub fn get_mut(&mut self, statistic: MetricStatistic) -> &mut f64 {
        match statistic {
            MetricStatistic::Min => &mut self.min,
            MetricStatistic::Q1 => &mut self.q1,
            MetricStatistic::Median => &mut self.median,
            MetricStatistic::Q3 => &mut self.q3,
            MetricStatistic::Max => &mut self.max,
            MetricStatistic::Mean => &mut self.mean,
            MetricStatistic::Std => &mut self.std,
        }
    }

    /// Apply `f` to every statistic
    #[must_use]
    pub fn map(mut self, f: impl Fn(f64) -> f64) -> Self {
        for statistic in MetricStatistic::ALL {
            let value = self.get_mut(statistic);
            *value = f(*value);
        }
        self
    }

    /// Whether the ordering invariant holds
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.min <= self.q1 && self.q1 <= self.median && self.median <= self.q3 && self.q3 <= self.max
    }
}

/// Metric name to summary, for one side of one body part
pub type MetricTable = BTreeMap<String, MetricSummary>;

/// Side to metric table, for one body part
pub type SideTable = BTreeMap<Side, MetricTable>;

/// Body part → side → metric → summary rollup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedSummary {
    /// Nested summary tables keyed by body part
    pub body_parts: BTreeMap<BodyPart, SideTable>,
}

impl AggregatedSummary {
    /// Create an empty rollup
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no summaries are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body_parts.is_empty()
    }

    /// Insert or replace one metric summary
    pub fn insert(&mut self, part: BodyPart, side: Side, metric: impl Into<String>, summary: MetricSummary) {
        self.body_parts
            .entry(part)
            .or_default()
            .entry(side)
            .or_default()
            .insert(metric.into(), summary);
    }

    /// Look up one metric summary
    #[must_use]
    pub fn get(&self, part: BodyPart, side: Side, metric: &str) -> Option<&MetricSummary> {
        self.body_parts
            .get(&part)
            .and_then(|sides| sides.get(&side))
            .and_then(|metrics| metrics.get(metric))
    }

    /// Total number of metric summaries across all body parts and sides
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.body_parts
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }
}
