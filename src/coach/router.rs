// ABOUTME: Retrieval router deciding which context sources a question needs
// ABOUTME: One structured-output generation call, strict JSON parsing and decision normalisation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use pierre_core::models::UserProfile;
use pierre_intelligence::ProfileDigest;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::session::HistoryEntry;
use super::strip_code_fences;
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::{PromptCompiler, PromptVars, TemplateId};
use crate::llm::{ChatRequest, ModelId, ModelRegistry};

/// Schema name sent with the structured-output request
const DECISION_SCHEMA_NAME: &str = "retrieval_decision";

/// Which context sources a question needs, and their parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalDecision {
    /// Search the knowledge base with `kb_query`
    #[serde(rename = "QueryKnowledgeBase_needed")]
    pub need_knowledge_base: bool,
    /// Fetch per-unit record data for `record_ids`
    #[serde(rename = "GetRawRunData_needed")]
    pub need_raw_data: bool,
    /// Generate a written summary of `record_ids`
    #[serde(rename = "GenerateRunSummary_needed")]
    pub need_summary: bool,
    /// Search external evidence with `fact_check_query`
    #[serde(rename = "GetGroundingAndFactCheckingData_needed")]
    pub need_fact_check: bool,
    /// Knowledge-base search string
    #[serde(rename = "query", default)]
    pub kb_query: String,
    /// Records to fetch or summarise
    #[serde(rename = "run_ids", default, deserialize_with = "deserialize_record_ids")]
    pub record_ids: Vec<u64>,
    /// Fact-check search question
    #[serde(rename = "fact_checking_query", default)]
    pub fact_check_query: String,
}

/// Accept ids as JSON integers or integral floats (`97` or `97.0`)
fn deserialize_record_ids<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .iter()
        .map(|value| {
            value
                .as_u64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                        .map(|f| f as u64)
                })
                .ok_or_else(|| D::Error::custom(format!("invalid record id {value}")))
        })
        .collect()
}

impl RetrievalDecision {
    /// JSON schema the backend must follow
    #[must_use]
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "GenerateRunSummary_needed": { "type": "boolean" },
                "GetRawRunData_needed": { "type": "boolean" },
                "QueryKnowledgeBase_needed": { "type": "boolean" },
                "GetGroundingAndFactCheckingData_needed": { "type": "boolean" },
                "query": { "type": "string" },
                "fact_checking_query": { "type": "string" },
                "run_ids": { "type": "array", "items": { "type": "integer" } }
            },
            "required": [
                "GenerateRunSummary_needed",
                "GetRawRunData_needed",
                "QueryKnowledgeBase_needed",
                "GetGroundingAndFactCheckingData_needed",
                "query",
                "fact_checking_query",
                "run_ids"
            ],
            "additionalProperties": false
        })
    }

    /// Parse backend output, tolerating a surrounding markdown code fence
    ///
    /// # Errors
    ///
    /// Returns `MALFORMED_DECISION` if the text is not a decision object.
    pub fn parse(output: &str) -> AppResult<Self> {
        let body = strip_code_fences(output);
        serde_json::from_str::<Self>(body).map_err(|e| {
            AppError::malformed_decision(format!("router output is not a retrieval decision: {e}"))
                .with_source(e)
        })
    }

    /// Enforce the decision invariants
    ///
    /// Summary wins over raw data; record flags without ids are dropped;
    /// empty search strings fall back to the question; ids are de-duplicated.
    #[must_use]
    pub fn normalized(mut self, question: &str) -> Self {
        if self.need_summary && self.need_raw_data {
            warn!("Router requested both summary and raw data, keeping summary");
            self.need_raw_data = false;
        }

        let mut seen = Vec::with_capacity(self.record_ids.len());
        self.record_ids.retain(|id| {
            let fresh = !seen.contains(id);
            seen.push(*id);
            fresh
        });

        if (self.need_summary || self.need_raw_data) && self.record_ids.is_empty() {
            warn!("Router requested record data without record ids, dropping the request");
            self.need_summary = false;
            self.need_raw_data = false;
        }
        if self.need_knowledge_base && self.kb_query.trim().is_empty() {
            question.clone_into(&mut self.kb_query);
        }
        if self.need_fact_check && self.fact_check_query.trim().is_empty() {
            question.clone_into(&mut self.fact_check_query);
        }
        self
    }

    /// Whether any source is requested
    #[must_use]
    pub const fn needs_any(&self) -> bool {
        self.need_knowledge_base || self.need_raw_data || self.need_summary || self.need_fact_check
    }
}

/// Classifies questions into a [`RetrievalDecision`]
#[derive(Debug, Clone)]
pub struct RetrievalRouter {
    registry: Arc<ModelRegistry>,
    compiler: Arc<PromptCompiler>,
    model: ModelId,
}

impl RetrievalRouter {
    /// Router calling `model` through `registry`
    #[must_use]
    pub const fn new(registry: Arc<ModelRegistry>, compiler: Arc<PromptCompiler>, model: ModelId) -> Self {
        Self {
            registry,
            compiler,
            model,
        }
    }

    /// Decide which sources `question` needs
    ///
    /// # Errors
    ///
    /// Returns `MALFORMED_DECISION` for unparsable output, or the backend error.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn route(
        &self,
        question: &str,
        profile: &UserProfile,
        history: &[HistoryEntry],
    ) -> AppResult<RetrievalDecision> {
        let vars = PromptVars::new()
            .text("user_query", question)
            .json("user_profile", &ProfileDigest::from(profile))?
            .json("chat_history", history)?;
        let prompt = self.compiler.render(TemplateId::RetrievalDecision, &vars)?;

        let request = ChatRequest::from_prompt(prompt)
            .with_json_schema(DECISION_SCHEMA_NAME, RetrievalDecision::schema());
        let response = self.registry.complete(self.model, request).await?;

        let decision = RetrievalDecision::parse(&response.content)?.normalized(question);
        info!(
            knowledge_base = decision.need_knowledge_base,
            raw_data = decision.need_raw_data,
            summary = decision.need_summary,
            fact_check = decision.need_fact_check,
            record_ids = ?decision.record_ids,
            "Retrieval decision"
        );
        Ok(decision)
    }
}
