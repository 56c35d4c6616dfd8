// ABOUTME: Prompt-ready serializations of exercise records and user profiles
// ABOUTME: Per-unit speed and summaries, per-record averages, and the cross-record rollup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::NaiveDate;
use pierre_core::errors::AppResult;
use pierre_core::models::{
    ActivityKind, AggregatedSummary, ExerciseRecord, ExerciseUnit, RecordRef, UserProfile,
};
use serde::{Deserialize, Serialize};

use crate::exercise_summary::ExerciseSummarizer;

/// One unit of a record (e.g. one kilometre) with its own summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDetail {
    /// Zero-based position of the unit within its record
    pub index: usize,
    /// Average speed over the unit
    pub speed: f64,
    /// Aggregated body-part summary of this unit alone
    pub summary: AggregatedSummary,
}

/// A record with per-unit detail and the average across its units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDetail {
    /// Record id
    pub id: u64,
    /// Activity kind
    pub kind: ActivityKind,
    /// Date of the activity
    pub date: NaiveDate,
    /// Units in record order
    pub units: Vec<UnitDetail>,
    /// Aggregate over every unit of the record
    pub averages_across_units: AggregatedSummary,
}

impl RecordDetail {
    /// Build the detail view of one record
    ///
    /// # Errors
    ///
    /// Propagates statistics errors from the summariser.
    pub fn build(record: &ExerciseRecord, summarizer: &ExerciseSummarizer) -> AppResult<Self> {
        let units = record
            .units
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                Ok(UnitDetail {
                    index,
                    speed: unit.speed,
                    summary: summarizer.summarize_units(&[unit])?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let all_units: Vec<&ExerciseUnit> = record.units.iter().collect();
        Ok(Self {
            id: record.id,
            kind: record.kind,
            date: record.date,
            units,
            averages_across_units: summarizer.summarize_units(&all_units)?,
        })
    }
}

/// Raw data payload handed to the coach for a set of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecordData {
    /// Per-record detail, in the order the records were given
    pub records: Vec<RecordDetail>,
    /// Aggregate over every unit of every record
    pub averages_across_records: AggregatedSummary,
}

impl RawRecordData {
    /// Build the payload for `records`
    ///
    /// # Errors
    ///
    /// Propagates statistics errors from the summariser.
    pub fn build(records: &[ExerciseRecord], summarizer: &ExerciseSummarizer) -> AppResult<Self> {
        let details = records
            .iter()
            .map(|record| RecordDetail::build(record, summarizer))
            .collect::<AppResult<Vec<_>>>()?;

        let all_units: Vec<&ExerciseUnit> = records.iter().flat_map(|r| r.units.iter()).collect();
        Ok(Self {
            records: details,
            averages_across_records: summarizer.summarize_units(&all_units)?,
        })
    }

    /// Whether no record was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids of the included records
    #[must_use]
    pub fn record_ids(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.id).collect()
    }
}

/// Compact profile view embedded in every prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDigest {
    /// Profile id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Weight in kilograms
    pub weight: f64,
    /// Height in centimetres
    pub height: f64,
    /// Historical performance rollup
    pub performance_summary: AggregatedSummary,
    /// Id, kind and date of every record
    pub records: Vec<RecordRef>,
}

impl From<&UserProfile> for ProfileDigest {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            weight: profile.weight,
            height: profile.height,
            performance_summary: profile.performance_summary.clone(),
            records: profile.records.clone(),
        }
    }
}
