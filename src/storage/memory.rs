// ABOUTME: In-memory record store seeded from code or loaded from a JSON dataset file
// ABOUTME: Builds each profile's performance rollup from every unit of the user's records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use pierre_core::constants::service_names::RECORD_STORE;
use pierre_core::models::{ExerciseRecord, ExerciseUnit, RecordRef, UserProfile};
use pierre_intelligence::ExerciseSummarizer;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::RecordStore;
use crate::errors::{AppError, AppResult, ErrorCode};

/// Identity and biometrics of a user, without derived data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    /// User identifier
    pub id: u64,
    /// Display name, unique within the store
    pub name: String,
    /// Height in centimetres
    pub height: f64,
    /// Weight in kilograms
    pub weight: f64,
}

/// On-disk dataset layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Users
    #[serde(default)]
    pub users: Vec<UserAccount>,
    /// Exercise records of every user
    #[serde(default)]
    pub records: Vec<ExerciseRecord>,
}

/// Record store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    users: HashMap<String, UserAccount>,
    records: BTreeMap<u64, ExerciseRecord>,
    summarizer: ExerciseSummarizer,
}

impl InMemoryRecordStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user
    #[must_use]
    pub fn with_user(mut self, user: UserAccount) -> Self {
        self.users.insert(user.name.clone(), user);
        self
    }

    /// Add or replace a record
    #[must_use]
    pub fn with_record(mut self, record: ExerciseRecord) -> Self {
        self.records.insert(record.id, record);
        self
    }

    /// Summarise with a custom body-part selection
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: ExerciseSummarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Store holding every user and record of `dataset`
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` if a record references an unknown user.
    pub fn from_dataset(dataset: Dataset) -> AppResult<Self> {
        let mut store = Self::new();
        for user in dataset.users {
            store = store.with_user(user);
        }
        for record in dataset.records {
            if !store.users.values().any(|u| u.id == record.user_id) {
                return Err(AppError::invalid_input(format!(
                    "record {} belongs to unknown user {}",
                    record.id, record.user_id
                )));
            }
            store = store.with_record(record);
        }
        Ok(store)
    }

    /// Load a JSON dataset file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or references
    /// unknown users.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load_json(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).await.map_err(|e| {
            AppError::new(
                ErrorCode::ResourceNotFound,
                format!("cannot read dataset {}: {e}", path.display()),
            )
            .with_source(e)
        })?;
        let dataset: Dataset = serde_json::from_str(&raw).map_err(|e| {
            AppError::new(
                ErrorCode::InvalidFormat,
                format!("invalid dataset {}: {e}", path.display()),
            )
            .with_source(e)
        })?;
        info!(
            users = dataset.users.len(),
            records = dataset.records.len(),
            "Loaded record dataset"
        );
        Self::from_dataset(dataset)
    }

    fn records_of(&self, user_id: u64) -> impl Iterator<Item = &ExerciseRecord> {
        self.records.values().filter(move |r| r.user_id == user_id)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    #[instrument(skip(self))]
    async fn fetch_profile(&self, name: &str) -> AppResult<UserProfile> {
        let user = self
            .users
            .get(name)
            .ok_or_else(|| AppError::not_found(format!("User profile '{name}'")))?;

        let mut records: Vec<RecordRef> = self.records_of(user.id).map(ExerciseRecord::reference).collect();
        records.sort_by_key(|r| (r.date, r.id));

        let units: Vec<&ExerciseUnit> = self.records_of(user.id).flat_map(|r| r.units.iter()).collect();
        let performance_summary = self.summarizer.summarize_units(&units).map_err(|e| {
            AppError::external_service(RECORD_STORE, format!("cannot summarise profile: {e}"))
                .with_source(e)
        })?;

        info!(user = %user.name, records = records.len(), "Loaded user profile");
        Ok(UserProfile {
            id: user.id,
            name: user.name.clone(),
            height: user.height,
            weight: user.weight,
            performance_summary,
            records,
        })
    }

    async fn fetch_records(&self, ids: &[u64]) -> AppResult<Vec<ExerciseRecord>> {
        let found: Vec<ExerciseRecord> = ids
            .iter()
            .filter_map(|id| {
                let record = self.records.get(id).cloned();
                if record.is_none() {
                    warn!(record_id = id, "Requested record does not exist");
                }
                record
            })
            .collect();
        debug!(requested = ids.len(), found = found.len(), "Fetched records");
        Ok(found)
    }
}
