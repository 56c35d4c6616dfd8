// ABOUTME: Integration tests for the seven-number metric summary
// ABOUTME: Quartile interpolation, population standard deviation, rounding and empty input
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

use pierre_core::errors::ErrorCode;
use pierre_intelligence::statistics::{round_to, summarize};

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[test]
fn test_summary_of_knee_angles() {
    let summary = summarize(&[10.0, 20.0, 30.0, 40.0]).unwrap();

    assert!(close(summary.min, 10.0));
    assert!(close(summary.q1, 17.5));
    assert!(close(summary.median, 25.0));
    assert!(close(summary.q3, 32.5));
    assert!(close(summary.max, 40.0));
    assert!(close(summary.mean, 25.0));
    // Population std of 10, 20, 30, 40 is sqrt(125)
    assert!(close(summary.std, 11.1803));
}

#[test]
fn test_unsorted_input_is_sorted_first() {
    let sorted = summarize(&[1.0, 2.0, 3.0]).unwrap();
    let shuffled = summarize(&[3.0, 1.0, 2.0]).unwrap();
    assert_eq!(sorted, shuffled);
    assert!(sorted.is_ordered());
}

#[test]
fn test_values_rounded_to_four_decimals() {
    let summary = summarize(&[1.0, 2.0, 2.0]).unwrap();
    // mean 5/3
    assert!(close(summary.mean, 1.6667));
    assert!(close(summary.std, 0.4714));
}

#[test]
fn test_nan_samples_ignored() {
    let summary = summarize(&[f64::NAN, 4.0, 6.0]).unwrap();
    assert!(close(summary.mean, 5.0));
    assert!(close(summary.min, 4.0));
}

#[test]
fn test_empty_series_rejected() {
    let error = summarize(&[]).unwrap_err();
    assert_eq!(error.code, ErrorCode::EmptyInput);
}

#[test]
fn test_rounding_ties_go_to_even() {
    assert!(close(round_to(2.5, 0), 2.0));
    assert!(close(round_to(3.5, 0), 4.0));
    assert!(close(round_to(-2.5, 0), -2.0));
    assert!(close(round_to(0.125, 2), 0.12));
    assert!(close(round_to(0.375, 2), 0.38));
    assert!(close(round_to(0.123_46, 4), 0.1235));
}

#[test]
fn test_exact_tie_in_summary_rounds_to_even() {
    // 1/32 = 0.03125 sits exactly halfway between 0.0312 and 0.0313
    let summary = summarize(&[0.031_25]).unwrap();
    assert!(close(summary.mean, 0.0312));
    assert!(close(summary.median, 0.0312));

    // 3/32 = 0.09375 lies between 0.0937 and 0.0938 and goes up to the even digit
    assert!(close(summarize(&[0.093_75]).unwrap().max, 0.0938));
}
