// ABOUTME: Model identifiers and the explicit model-to-backend registry built once at start-up
// ABOUTME: Replaces process-wide factory state with a constructed object passed to the orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{
    AnthropicProvider, ChatRequest, ChatResponse, ChatStream, GeminiProvider, HttpSettings,
    LlmProvider, OpenAiCompatibleConfig, OpenAiCompatibleProvider,
};
use crate::config::LlmConfig;
use crate::errors::{AppError, AppResult, ErrorCode};

/// Vendor API family serving a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Generative Language API
    Gemini,
    /// `OpenAI` chat completions
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
}

/// Every model the coach can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelId {
    /// Default answer model
    #[serde(rename = "gemini-2.5-flash-preview-04-17")]
    Gemini25FlashPreview,
    /// Default record and session summary model
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,
    /// `OpenAI` general model
    #[serde(rename = "gpt-4.1")]
    Gpt41,
    /// Anthropic general model
    #[serde(rename = "claude-3-7-sonnet-20250219")]
    Claude37Sonnet,
    /// Default retrieval-router model
    #[serde(rename = "o4-mini")]
    O4Mini,
}

impl ModelId {
    /// All known models
    pub const ALL: [Self; 5] = [
        Self::Gemini25FlashPreview,
        Self::Gemini20Flash,
        Self::Gpt41,
        Self::Claude37Sonnet,
        Self::O4Mini,
    ];

    /// Wire model name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini25FlashPreview => "gemini-2.5-flash-preview-04-17",
            Self::Gemini20Flash => "gemini-2.0-flash",
            Self::Gpt41 => "gpt-4.1",
            Self::Claude37Sonnet => "claude-3-7-sonnet-20250219",
            Self::O4Mini => "o4-mini",
        }
    }

    /// API family serving this model
    #[must_use]
    pub const fn provider_kind(&self) -> ProviderKind {
        match self {
            Self::Gemini25FlashPreview | Self::Gemini20Flash => ProviderKind::Gemini,
            Self::Gpt41 | Self::O4Mini => ProviderKind::OpenAi,
            Self::Claude37Sonnet => ProviderKind::Anthropic,
        }
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::invalid_input(format!("Unknown model identifier: {s}")))
    }
}

/// Explicit mapping from [`ModelId`] to the backend that serves it
///
/// Built once, then shared read-only by every session.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    providers: BTreeMap<ModelId, Arc<dyn LlmProvider>>,
}

impl ModelRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `model` to `provider`, replacing any earlier registration
    pub fn register(&mut self, model: ModelId, provider: Arc<dyn LlmProvider>) {
        debug!(model = %model, provider = provider.name(), "Registering model");
        self.providers.insert(model, provider);
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with_model(mut self, model: ModelId, provider: Arc<dyn LlmProvider>) -> Self {
        self.register(model, provider);
        self
    }

    /// Register every model of each vendor whose API key is configured
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created.
    #[instrument(skip(config))]
    pub fn from_config(config: &LlmConfig) -> AppResult<Self> {
        let settings = config.http_settings();
        let mut registry = Self::new();

        if let Some(key) = &config.gemini_api_key {
            registry.register_kind(
                ProviderKind::Gemini,
                Arc::new(GeminiProvider::new(key.as_str(), &settings)?),
            );
        }
        if let Some(key) = &config.openai_api_key {
            registry.register_kind(
                ProviderKind::OpenAi,
                Arc::new(OpenAiCompatibleProvider::new(
                    OpenAiCompatibleConfig::openai(key.as_str()),
                    &settings,
                )?),
            );
        }
        if let Some(key) = &config.anthropic_api_key {
            registry.register_kind(
                ProviderKind::Anthropic,
                Arc::new(AnthropicProvider::new(key.as_str(), &settings)?),
            );
        }

        info!(models = ?registry.models(), "Model registry initialized");
        Ok(registry)
    }

    fn register_kind(&mut self, kind: ProviderKind, provider: Arc<dyn LlmProvider>) {
        for model in ModelId::ALL.into_iter().filter(|m| m.provider_kind() == kind) {
            self.register(model, Arc::clone(&provider));
        }
    }

    /// Backend serving `model`
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_MISSING` if no backend was registered for the model.
    pub fn get(&self, model: ModelId) -> AppResult<Arc<dyn LlmProvider>> {
        self.providers.get(&model).cloned().ok_or_else(|| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("No generation backend registered for model {model}"),
            )
        })
    }

    /// Whether `model` has a backend
    #[must_use]
    pub fn contains(&self, model: ModelId) -> bool {
        self.providers.contains_key(&model)
    }

    /// Registered models in identifier order
    #[must_use]
    pub fn models(&self) -> Vec<ModelId> {
        self.providers.keys().copied().collect()
    }

    /// Blocking completion on `model`
    ///
    /// # Errors
    ///
    /// Returns an error if the model is unregistered or the backend fails.
    pub async fn complete(&self, model: ModelId, request: ChatRequest) -> AppResult<ChatResponse> {
        let provider = self.get(model)?;
        provider.complete(&request.with_model(model.as_str())).await
    }

    /// Streamed completion on `model`
    ///
    /// # Errors
    ///
    /// Returns an error if the model is unregistered or the request fails.
    pub async fn stream(&self, model: ModelId, request: ChatRequest) -> AppResult<ChatStream> {
        let provider = self.get(model)?;
        provider
            .complete_stream(&request.with_model(model.as_str()).with_streaming())
            .await
    }
}

impl Debug for ModelRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.providers.iter().map(|(m, p)| (m.as_str(), p.name())))
            .finish()
    }
}

impl LlmConfig {
    /// Timeout and retry settings for backend clients
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings::default()
            .with_request_timeout(self.request_timeout)
            .with_retry(self.retry)
    }
}
