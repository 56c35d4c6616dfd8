// ABOUTME: Read-mostly record storage abstraction for user profiles and exercise records
// ABOUTME: Profiles are fetched by name, records by id list with unknown ids skipped
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// In-memory store seeded from code or a JSON dataset
pub mod memory;

use async_trait::async_trait;
use pierre_core::models::{ExerciseRecord, UserProfile};

use crate::errors::AppResult;

pub use memory::{Dataset, InMemoryRecordStore, UserAccount};

/// Source of profiles and exercise records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a user's profile, including the performance rollup over all of
    /// their records
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` for an unknown name.
    async fn fetch_profile(&self, name: &str) -> AppResult<UserProfile>;

    /// Load the records with the given ids, in request order
    ///
    /// Ids that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn fetch_records(&self, ids: &[u64]) -> AppResult<Vec<ExerciseRecord>>;
}
