// ABOUTME: Seven-number distributional summary of a numeric series
// ABOUTME: Linear-interpolation quartiles, population standard deviation, fixed 4-decimal rounding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::constants::statistics::{
    MEDIAN_PERCENTILE, Q1_PERCENTILE, Q3_PERCENTILE, SUMMARY_PRECISION,
};
use pierre_core::errors::{AppError, AppResult};
use pierre_core::models::MetricSummary;

/// Round `value` to `decimals` places, ties to even
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    let rounded = (value * factor).round_ties_even() / factor;
    // Normalise -0.0
    if rounded.abs() < f64::EPSILON {
        0.0
    } else {
        rounded
    }
}

/// Round to the summary precision
#[must_use]
pub fn round_summary_value(value: f64) -> f64 {
    round_to(value, SUMMARY_PRECISION)
}

/// Percentile of an ascending-sorted, non-empty slice using linear interpolation
/// between closest ranks
fn percentile_sorted(sorted: &[f64], percentile: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = percentile / 100.0 * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Compute min, quartiles, max, mean and population standard deviation
///
/// NaN samples are ignored. Every statistic is rounded to four decimals.
///
/// # Errors
///
/// Returns an `EMPTY_INPUT` error if `values` has no finite samples.
pub fn summarize(values: &[f64]) -> AppResult<MetricSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(AppError::empty_input("metric series"));
    }
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / count;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    let summary = MetricSummary {
        min: sorted[0],
        q1: percentile_sorted(&sorted, Q1_PERCENTILE),
        median: percentile_sorted(&sorted, MEDIAN_PERCENTILE),
        q3: percentile_sorted(&sorted, Q3_PERCENTILE),
        max: sorted[sorted.len() - 1],
        mean,
        std: variance.sqrt(),
    };

    Ok(summary.map(round_summary_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile_sorted(&sorted, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 75.0) - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_round_to_precision() {
        assert!((round_to(1.234_56, 4) - 1.2346).abs() < 1e-12);
        assert!((round_to(-0.000_01, 4)).abs() < f64::EPSILON);
        assert!(round_to(-0.000_01, 4).is_sign_positive());
    }

    #[test]
    fn test_single_value_series() {
        let summary = summarize(&[7.5]).unwrap();
        assert!((summary.min - 7.5).abs() < f64::EPSILON);
        assert!((summary.median - 7.5).abs() < f64::EPSILON);
        assert!(summary.std.abs() < f64::EPSILON);
    }

    #[test]
    fn test_nan_only_is_empty() {
        assert!(summarize(&[f64::NAN]).is_err());
    }
}
