// ABOUTME: Conversation turn type shared by the session manager and prompts
// ABOUTME: Renders turns in the "User: / Coach:" transcript form
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use crate::constants::session::{COACH_PREFIX, USER_PREFIX};

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The user's question
    pub question: String,
    /// The coach's answer (or the error message shown for a failed turn)
    pub answer: String,
}

impl Turn {
    /// Create a new turn
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Transcript form as a `(User: .., Coach: ..)` pair
    #[must_use]
    pub fn transcript(&self) -> (String, String) {
        (
            format!("{USER_PREFIX}{}", self.question),
            format!("{COACH_PREFIX}{}", self.answer),
        )
    }
}
