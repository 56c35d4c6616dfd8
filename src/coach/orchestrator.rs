// ABOUTME: CoachService facade running one conversation turn end to end
// ABOUTME: Route, assemble, compile, generate (blocking or streamed), then record the turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use futures_util::StreamExt;
use pierre_core::constants::retrieval::GROUNDING_SUFFIX;
use pierre_core::constants::session::ERROR_ANSWER_PREFIX;
use pierre_core::models::{Turn, UserProfile};
use pierre_intelligence::ProfileDigest;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::assembler::{ContextAssembler, ContextBundle};
use super::progress::{ProgressReporter, ProgressUpdate};
use super::router::RetrievalRouter;
use super::session::{HistoryEntry, SessionCompressor, SessionManager};
use crate::config::{CoachConfig, FactCheckConfig, LlmConfig};
use crate::errors::AppResult;
use crate::grounding::{FactChecker, LinkupFactChecker, UnconfiguredFactChecker};
use crate::knowledge::KnowledgeBase;
use crate::llm::prompts::{PromptCompiler, PromptVars, TemplateId};
use crate::llm::{ChatRequest, ModelRegistry};
use crate::storage::RecordStore;

/// Shared, read-only collaborators of a coach session
///
/// Every field may be reused across any number of sessions.
#[derive(Clone)]
pub struct CoachDependencies {
    /// Generation backends by model
    pub registry: Arc<ModelRegistry>,
    /// Sports-science text search
    pub knowledge_base: Arc<dyn KnowledgeBase>,
    /// External evidence search
    pub fact_checker: Arc<dyn FactChecker>,
    /// Profiles and exercise records
    pub record_store: Arc<dyn RecordStore>,
}

impl CoachDependencies {
    /// Build the registry and fact checker from configuration
    ///
    /// Without a search key the fact checker degrades every lookup to the fallback payload.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(
        llm: &LlmConfig,
        fact_check: &FactCheckConfig,
        knowledge_base: Arc<dyn KnowledgeBase>,
        record_store: Arc<dyn RecordStore>,
    ) -> AppResult<Self> {
        let registry = ModelRegistry::from_config(llm)?;
        let fact_checker: Arc<dyn FactChecker> = if fact_check.api_key.is_some() {
            Arc::new(LinkupFactChecker::new(fact_check, &llm.http_settings())?)
        } else {
            warn!(
                env = FactCheckConfig::API_KEY_ENV,
                "No fact-check key configured, evidence lookups will fall back"
            );
            Arc::new(UnconfiguredFactChecker)
        };
        Ok(Self {
            registry: Arc::new(registry),
            knowledge_base,
            fact_checker,
            record_store,
        })
    }
}

impl Debug for CoachDependencies {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoachDependencies")
            .field("registry", &self.registry)
            .field("fact_checker", &self.fact_checker.name())
            .finish_non_exhaustive()
    }
}

/// One coaching conversation for one user
///
/// Turns are processed strictly one at a time: every entry point takes `&mut self`.
pub struct CoachService {
    profile: UserProfile,
    config: CoachConfig,
    registry: Arc<ModelRegistry>,
    compiler: Arc<PromptCompiler>,
    router: RetrievalRouter,
    assembler: ContextAssembler,
    session: SessionManager,
}

impl CoachService {
    /// Start a conversation with `profile`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid or a configured
    /// model has no registered backend.
    pub fn new(deps: CoachDependencies, config: CoachConfig, profile: UserProfile) -> AppResult<Self> {
        config.validate()?;
        for model in [config.router_model, config.summary_model, config.answer_model] {
            deps.registry.get(model)?;
        }

        let compiler = Arc::new(PromptCompiler::new());
        let router = RetrievalRouter::new(
            Arc::clone(&deps.registry),
            Arc::clone(&compiler),
            config.router_model,
        );
        let assembler = ContextAssembler::new(
            deps.knowledge_base,
            deps.fact_checker,
            deps.record_store,
            Arc::clone(&deps.registry),
            Arc::clone(&compiler),
            config.summary_model,
        )
        .with_kb_top_k(config.kb_top_k);
        let session = SessionManager::new(
            config.history_threshold,
            SessionCompressor::new(
                Arc::clone(&deps.registry),
                Arc::clone(&compiler),
                config.summary_model,
            ),
        );

        info!(
            user = %profile.name,
            records = profile.records.len(),
            router = %config.router_model,
            answer = %config.answer_model,
            "Coach session started"
        );
        Ok(Self {
            profile,
            config,
            registry: deps.registry,
            compiler,
            router,
            assembler,
            session,
        })
    }

    /// Load `name` from the record store and start a conversation
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` for an unknown user, or any error of [`Self::new`].
    pub async fn for_user(deps: CoachDependencies, config: CoachConfig, name: &str) -> AppResult<Self> {
        let profile = deps.record_store.fetch_profile(name).await?;
        Self::new(deps, config, profile)
    }

    /// Answer `question` with a single blocking generation call
    ///
    /// # Errors
    ///
    /// Returns the routing, assembly, prompt or generation error after
    /// recording an apology as the turn's answer, or a compression error
    /// after recording the answered turn.
    #[instrument(skip_all, fields(user = %self.profile.name))]
    pub async fn ask(&mut self, question: &str) -> AppResult<String> {
        let progress = ProgressReporter::silent();
        let outcome = match self.prepare_request(question, &progress).await {
            Ok(request) => self
                .registry
                .complete(self.config.answer_model, request)
                .await
                .map(|response| response.content),
            Err(e) => Err(e),
        };
        self.finish_turn(question, outcome, &progress).await
    }

    /// Answer `question`, forwarding each generated chunk to `on_chunk`
    ///
    /// Cancelling `cancel` stops forwarding; the partial answer received so far
    /// is recorded and returned.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ask`], plus stream errors raised mid-answer.
    #[instrument(skip_all, fields(user = %self.profile.name))]
    pub async fn ask_streaming<F>(
        &mut self,
        question: &str,
        mut on_chunk: F,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> AppResult<String>
    where
        F: FnMut(&str) + Send,
    {
        let outcome = match self.prepare_request(question, progress).await {
            Ok(request) => self.stream_answer(request, &mut on_chunk, cancel).await,
            Err(e) => Err(e),
        };
        self.finish_turn(question, outcome, progress).await
    }

    async fn prepare_request(&self, question: &str, progress: &ProgressReporter) -> AppResult<ChatRequest> {
        progress.report(&ProgressUpdate::analyzing());
        let history = self.session.history_for_prompt();
        let decision = self.router.route(question, &self.profile, &history).await?;
        let bundle = self.assembler.assemble(&decision, &self.profile, progress).await?;

        progress.report(&ProgressUpdate::generating());
        let prompt = self.render_answer_prompt(question, &history, &bundle)?;

        let request = ChatRequest::from_prompt(prompt).with_temperature(self.config.answer_temperature);
        Ok(match self.config.answer_max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        })
    }

    fn render_answer_prompt(
        &self,
        question: &str,
        history: &[HistoryEntry],
        bundle: &ContextBundle,
    ) -> AppResult<String> {
        let query = if bundle.fact_check_succeeded() {
            format!("{question}{GROUNDING_SUFFIX}")
        } else {
            question.to_owned()
        };
        let fact_checking_data = bundle.fact_check_data.as_ref().map(|data| data.payload());

        let vars = PromptVars::new()
            .text("query", query)
            .json("user_profile", &ProfileDigest::from(&self.profile))?
            .json("chat_history", history)?
            .text("run_summary_data", bundle.summary_text.as_deref().unwrap_or_default())
            .json("raw_run_data", &bundle.raw_data)?
            .json("book_content", &bundle.chunks)?
            .json("fact_checking_data", &fact_checking_data)?;
        self.compiler.render(TemplateId::Coach, &vars)
    }

    async fn stream_answer<F>(
        &self,
        request: ChatRequest,
        on_chunk: &mut F,
        cancel: &CancellationToken,
    ) -> AppResult<String>
    where
        F: FnMut(&str) + Send,
    {
        let mut stream = self.registry.stream(self.config.answer_model, request).await?;
        let mut answer = String::new();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(partial_chars = answer.len(), "Answer stream cancelled");
                    break;
                }
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        if !chunk.delta.is_empty() {
                            on_chunk(&chunk.delta);
                            answer.push_str(&chunk.delta);
                        }
                        if chunk.is_final {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                },
            }
        }
        Ok(answer)
    }

    async fn finish_turn(
        &mut self,
        question: &str,
        outcome: AppResult<String>,
        progress: &ProgressReporter,
    ) -> AppResult<String> {
        match outcome {
            Ok(answer) => {
                self.session.record_turn(question, answer.as_str()).await?;
                progress.report(&ProgressUpdate::done());
                Ok(answer)
            }
            Err(e) => {
                error!(code = ?e.code, error = %e, "Coach turn failed");
                let apology = format!("{ERROR_ANSWER_PREFIX}{}", e.message);
                if let Err(compress_error) = self.session.record_turn(question, apology).await {
                    warn!(error = %compress_error, "History compression failed after a failed turn");
                }
                Err(e)
            }
        }
    }

    /// Every turn of the conversation, including failed ones
    #[must_use]
    pub fn turn_log(&self) -> &[Turn] {
        self.session.turn_log()
    }

    /// History handed to the next turn's prompts
    #[must_use]
    pub fn history_for_prompt(&self) -> Vec<HistoryEntry> {
        self.session.history_for_prompt()
    }

    /// Profile of the user being coached
    #[must_use]
    pub const fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Session memory
    #[must_use]
    pub const fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &CoachConfig {
        &self.config
    }
}

impl Debug for CoachService {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoachService")
            .field("user", &self.profile.name)
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
