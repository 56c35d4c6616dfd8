// ABOUTME: User profile with biometrics, performance rollup, and record references
// ABOUTME: Loaded once per conversation and treated as immutable for its duration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::exercise::ActivityKind;
use super::summary::AggregatedSummary;

/// Reference to an exercise record (identifier, kind and date only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    /// Record identifier
    pub id: u64,
    /// Kind of activity
    pub kind: ActivityKind,
    /// Day the activity took place
    pub date: NaiveDate,
}

/// A coached user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User identifier
    pub id: u64,
    /// Display name, unique within a record store
    pub name: String,
    /// Height in centimeters
    pub height: f64,
    /// Weight in kilograms
    pub weight: f64,
    /// Rollup of every unit of every record the user logged
    #[serde(default)]
    pub performance_summary: AggregatedSummary,
    /// References to the user's records, oldest first
    #[serde(default)]
    pub records: Vec<RecordRef>,
}

impl UserProfile {
    /// Most recent record reference, if any
    #[must_use]
    pub fn latest_record(&self) -> Option<&RecordRef> {
        self.records.iter().max_by_key(|record| record.date)
    }

    /// Records that took place on `date`
    pub fn records_on(&self, date: NaiveDate) -> impl Iterator<Item = &RecordRef> {
        self.records.iter().filter(move |record| record.date == date)
    }
}
