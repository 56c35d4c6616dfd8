// ABOUTME: Runs the lookups selected by a retrieval decision and gathers them into one bundle
// ABOUTME: Knowledge-base, record and fact-check lookups run concurrently; fact-check failure degrades
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use pierre_core::constants::retrieval::{DEFAULT_KB_TOP_K, FACT_CHECK_FALLBACK};
use pierre_core::models::UserProfile;
use pierre_intelligence::{ExerciseSummarizer, ProfileDigest, RawRecordData};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::progress::{ProgressReporter, ProgressUpdate};
use super::router::RetrievalDecision;
use crate::errors::{AppError, AppResult};
use crate::grounding::FactChecker;
use crate::knowledge::{Chunk, KnowledgeBase};
use crate::llm::prompts::{PromptCompiler, PromptVars, TemplateId};
use crate::llm::{ChatRequest, ModelId, ModelRegistry};
use crate::storage::RecordStore;

/// Outcome of the fact-check lookup
#[derive(Debug, Clone, PartialEq)]
pub enum FactCheckData {
    /// Search payload returned by the fact checker
    Evidence(Value),
    /// The search failed; the answer is generated without evidence
    Unavailable {
        /// Failure message
        error: String,
    },
}

impl FactCheckData {
    /// JSON injected into the coach prompt
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Evidence(value) => value.clone(),
            Self::Unavailable { error } => json!({
                "error": error,
                "fallback": FACT_CHECK_FALLBACK,
            }),
        }
    }
}

/// Everything the lookups produced for one turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBundle {
    /// Ranked knowledge-base chunks, empty when not requested
    pub chunks: Vec<Chunk>,
    /// Per-record data when raw data was requested and records exist
    pub raw_data: Option<RawRecordData>,
    /// Written record report when a summary was requested and records exist
    pub summary_text: Option<String>,
    /// Fact-check result when requested
    pub fact_check_data: Option<FactCheckData>,
}

impl ContextBundle {
    /// Whether fact-check evidence was retrieved
    #[must_use]
    pub const fn fact_check_succeeded(&self) -> bool {
        matches!(self.fact_check_data, Some(FactCheckData::Evidence(_)))
    }

    /// Whether no lookup produced anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
            && self.raw_data.is_none()
            && self.summary_text.is_none()
            && self.fact_check_data.is_none()
    }
}

/// Record lookups produce either raw data or a summary
type RecordContext = (Option<RawRecordData>, Option<String>);

/// Executes retrieval decisions against the collaborators
#[derive(Clone)]
pub struct ContextAssembler {
    knowledge_base: Arc<dyn KnowledgeBase>,
    fact_checker: Arc<dyn FactChecker>,
    record_store: Arc<dyn RecordStore>,
    registry: Arc<ModelRegistry>,
    compiler: Arc<PromptCompiler>,
    summary_model: ModelId,
    kb_top_k: usize,
    summarizer: ExerciseSummarizer,
}

impl Debug for ContextAssembler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAssembler")
            .field("fact_checker", &self.fact_checker.name())
            .field("summary_model", &self.summary_model)
            .field("kb_top_k", &self.kb_top_k)
            .finish_non_exhaustive()
    }
}

impl ContextAssembler {
    /// Assembler over the given collaborators
    #[must_use]
    pub fn new(
        knowledge_base: Arc<dyn KnowledgeBase>,
        fact_checker: Arc<dyn FactChecker>,
        record_store: Arc<dyn RecordStore>,
        registry: Arc<ModelRegistry>,
        compiler: Arc<PromptCompiler>,
        summary_model: ModelId,
    ) -> Self {
        Self {
            knowledge_base,
            fact_checker,
            record_store,
            registry,
            compiler,
            summary_model,
            kb_top_k: DEFAULT_KB_TOP_K,
            summarizer: ExerciseSummarizer::default(),
        }
    }

    /// Number of chunks requested from the knowledge base
    #[must_use]
    pub const fn with_kb_top_k(mut self, kb_top_k: usize) -> Self {
        self.kb_top_k = kb_top_k;
        self
    }

    /// Summarise records with a custom body-part selection
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: ExerciseSummarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Run every lookup `decision` selects
    ///
    /// Lookups run concurrently and none is cancelled when another fails.
    ///
    /// # Errors
    ///
    /// Returns the first knowledge-base, record or generation error. Fact-check
    /// search failures never fail assembly.
    #[instrument(skip_all, fields(
        knowledge_base = decision.need_knowledge_base,
        raw_data = decision.need_raw_data,
        summary = decision.need_summary,
        fact_check = decision.need_fact_check,
    ))]
    pub async fn assemble(
        &self,
        decision: &RetrievalDecision,
        profile: &UserProfile,
        progress: &ProgressReporter,
    ) -> AppResult<ContextBundle> {
        let (chunks, records, fact_check_data) = tokio::join!(
            self.knowledge_lookup(decision, progress),
            self.record_lookup(decision, profile, progress),
            self.fact_check_lookup(decision, progress),
        );
        let chunks = chunks?;
        let (raw_data, summary_text) = records?;
        let fact_check_data = fact_check_data?;

        let bundle = ContextBundle {
            chunks,
            raw_data,
            summary_text,
            fact_check_data,
        };
        info!(
            chunks = bundle.chunks.len(),
            raw_records = bundle.raw_data.as_ref().map_or(0, |raw| raw.records.len()),
            has_summary = bundle.summary_text.is_some(),
            fact_checked = bundle.fact_check_succeeded(),
            "Context assembled"
        );
        Ok(bundle)
    }

    async fn knowledge_lookup(
        &self,
        decision: &RetrievalDecision,
        progress: &ProgressReporter,
    ) -> AppResult<Vec<Chunk>> {
        if !decision.need_knowledge_base {
            return Ok(Vec::new());
        }
        progress.report(&ProgressUpdate::searching_knowledge_base(&decision.kb_query));
        self.knowledge_base
            .hybrid_search(&decision.kb_query, self.kb_top_k)
            .await
    }

    async fn record_lookup(
        &self,
        decision: &RetrievalDecision,
        profile: &UserProfile,
        progress: &ProgressReporter,
    ) -> AppResult<RecordContext> {
        if !decision.need_raw_data && !decision.need_summary {
            return Ok((None, None));
        }
        let ids = &decision.record_ids;
        if decision.need_raw_data {
            progress.report(&ProgressUpdate::fetching_records(ids));
        }
        if decision.need_summary {
            progress.report(&ProgressUpdate::summarizing_records(ids));
        }

        let records = self.record_store.fetch_records(ids).await?;
        if records.is_empty() {
            warn!(record_ids = ?ids, "None of the requested records exist");
            return Ok((None, None));
        }
        let raw = RawRecordData::build(&records, &self.summarizer)?;

        if decision.need_summary {
            let summary = self.summarize_records(profile, &raw).await?;
            return Ok((None, Some(summary)));
        }
        Ok((Some(raw), None))
    }

    #[instrument(skip_all, fields(model = %self.summary_model, records = raw.records.len()))]
    async fn summarize_records(&self, profile: &UserProfile, raw: &RawRecordData) -> AppResult<String> {
        let vars = PromptVars::new()
            .json("user_profile", &ProfileDigest::from(profile))?
            .json("run_data", raw)?;
        let prompt = self.compiler.render(TemplateId::RecordSummary, &vars)?;
        let response = self
            .registry
            .complete(self.summary_model, ChatRequest::from_prompt(prompt))
            .await?;
        Ok(response.content.trim().to_owned())
    }

    async fn fact_check_lookup(
        &self,
        decision: &RetrievalDecision,
        progress: &ProgressReporter,
    ) -> AppResult<Option<FactCheckData>> {
        if !decision.need_fact_check {
            return Ok(None);
        }
        progress.report(&ProgressUpdate::fact_checking(&decision.fact_check_query));

        let vars = PromptVars::new().text("search_query", &decision.fact_check_query);
        let query = self.compiler.render(TemplateId::FactCheckQuery, &vars)?;

        match self.fact_checker.search(&query).await {
            Ok(evidence) => Ok(Some(FactCheckData::Evidence(evidence))),
            Err(e) => Ok(Some(self.degrade(&e, progress))),
        }
    }

    fn degrade(&self, error: &AppError, progress: &ProgressReporter) -> FactCheckData {
        warn!(
            checker = self.fact_checker.name(),
            error = %error,
            "Fact-check search failed, continuing without evidence"
        );
        progress.report(&ProgressUpdate::fact_check_failed());
        FactCheckData::Unavailable {
            error: error.message.clone(),
        }
    }
}
