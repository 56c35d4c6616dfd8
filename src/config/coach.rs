// ABOUTME: Environment-driven configuration for the coach pipeline, generation backends and fact-checking
// ABOUTME: Typed structs with documented defaults, secrets redacted from Debug output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use pierre_core::constants::generation::{DEFAULT_ANSWER_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
use pierre_core::constants::retrieval::DEFAULT_KB_TOP_K;
use pierre_core::constants::session::DEFAULT_HISTORY_THRESHOLD;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};
use crate::llm::sse_parser::RetryConfig;
use crate::llm::ModelId;

/// Read a non-empty environment variable
fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Parse an environment variable, falling back to `default` when unset
fn env_parse<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_optional(key).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}")))
    })
}

/// Model identifier from the environment; unknown names fall back to `default`
fn env_model(key: &str, default: ModelId) -> ModelId {
    match env_optional(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, fallback = %default, "Unknown model identifier, using default");
            default
        }),
    }
}

/// Pipeline tuning: history window, model routing and answer sampling
#[derive(Debug, Clone, PartialEq)]
pub struct CoachConfig {
    /// Active-window length above which the session compresses
    pub history_threshold: usize,
    /// Model deciding which context to retrieve
    pub router_model: ModelId,
    /// Model writing record summaries and session compressions
    pub summary_model: ModelId,
    /// Model writing the final answer
    pub answer_model: ModelId,
    /// Sampling temperature for the final answer
    pub answer_temperature: f32,
    /// Optional output cap for the final answer
    pub answer_max_tokens: Option<u32>,
    /// Knowledge-base chunks per search
    pub kb_top_k: usize,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            history_threshold: DEFAULT_HISTORY_THRESHOLD,
            router_model: ModelId::O4Mini,
            summary_model: ModelId::Gemini20Flash,
            answer_model: ModelId::Gemini25FlashPreview,
            answer_temperature: DEFAULT_ANSWER_TEMPERATURE,
            answer_max_tokens: None,
            kb_top_k: DEFAULT_KB_TOP_K,
        }
    }
}

impl CoachConfig {
    /// History threshold variable
    pub const HISTORY_THRESHOLD_ENV: &'static str = "COACH_HISTORY_THRESHOLD";
    /// Router model variable
    pub const ROUTER_MODEL_ENV: &'static str = "COACH_ROUTER_MODEL";
    /// Summary model variable
    pub const SUMMARY_MODEL_ENV: &'static str = "COACH_SUMMARY_MODEL";
    /// Answer model variable
    pub const ANSWER_MODEL_ENV: &'static str = "COACH_ANSWER_MODEL";
    /// Answer temperature variable
    pub const ANSWER_TEMPERATURE_ENV: &'static str = "COACH_ANSWER_TEMPERATURE";
    /// Answer token cap variable
    pub const ANSWER_MAX_TOKENS_ENV: &'static str = "COACH_ANSWER_MAX_TOKENS";
    /// Knowledge-base top-k variable
    pub const KB_TOP_K_ENV: &'static str = "COACH_KB_TOP_K";

    /// Load from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unparsable numbers or out-of-range values.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let config = Self {
            history_threshold: env_parse(Self::HISTORY_THRESHOLD_ENV, defaults.history_threshold)?,
            router_model: env_model(Self::ROUTER_MODEL_ENV, defaults.router_model),
            summary_model: env_model(Self::SUMMARY_MODEL_ENV, defaults.summary_model),
            answer_model: env_model(Self::ANSWER_MODEL_ENV, defaults.answer_model),
            answer_temperature: env_parse(Self::ANSWER_TEMPERATURE_ENV, defaults.answer_temperature)?,
            answer_max_tokens: env_optional(Self::ANSWER_MAX_TOKENS_ENV)
                .map(|raw| {
                    raw.parse().map_err(|e| {
                        AppError::config(format!(
                            "Invalid {} value '{raw}': {e}",
                            Self::ANSWER_MAX_TOKENS_ENV
                        ))
                    })
                })
                .transpose()?,
            kb_top_k: env_parse(Self::KB_TOP_K_ENV, defaults.kb_top_k)?,
        };
        config.validate()?;
        info!(
            router = %config.router_model,
            summary = %config.summary_model,
            answer = %config.answer_model,
            history_threshold = config.history_threshold,
            "Coach configuration loaded"
        );
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending value.
    pub fn validate(&self) -> AppResult<()> {
        if self.history_threshold == 0 {
            return Err(AppError::config("history threshold must be at least 1"));
        }
        if self.kb_top_k == 0 {
            return Err(AppError::config("knowledge-base top-k must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.answer_temperature) {
            return Err(AppError::config(format!(
                "answer temperature {} outside 0.0..=2.0",
                self.answer_temperature
            )));
        }
        Ok(())
    }

    /// Override the history threshold
    #[must_use]
    pub const fn with_history_threshold(mut self, threshold: usize) -> Self {
        self.history_threshold = threshold;
        self
    }
}

/// Credentials and transport policy for the generation backends
#[derive(Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Google Generative Language API key
    pub gemini_api_key: Option<String>,
    /// `OpenAI` API key
    pub openai_api_key: Option<String>,
    /// Anthropic API key
    pub anthropic_api_key: Option<String>,
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            openai_api_key: None,
            anthropic_api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::disabled(),
        }
    }
}

impl LlmConfig {
    /// Gemini key variable
    pub const GEMINI_API_KEY_ENV: &'static str = "GEMINI_API_KEY";
    /// `OpenAI` key variable
    pub const OPENAI_API_KEY_ENV: &'static str = "OPENAI_API_KEY";
    /// Anthropic key variable
    pub const ANTHROPIC_API_KEY_ENV: &'static str = "ANTHROPIC_API_KEY";
    /// Request timeout variable (seconds)
    pub const TIMEOUT_ENV: &'static str = "COACH_LLM_TIMEOUT_SECS";
    /// Retry count variable
    pub const MAX_RETRIES_ENV: &'static str = "COACH_LLM_MAX_RETRIES";

    /// Load from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unparsable numbers.
    pub fn from_env() -> AppResult<Self> {
        let timeout_secs = env_parse(Self::TIMEOUT_ENV, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(AppError::config("generation timeout must be at least 1 second"));
        }
        let config = Self {
            gemini_api_key: env_optional(Self::GEMINI_API_KEY_ENV),
            openai_api_key: env_optional(Self::OPENAI_API_KEY_ENV),
            anthropic_api_key: env_optional(Self::ANTHROPIC_API_KEY_ENV),
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryConfig::with_max_retries(env_parse(Self::MAX_RETRIES_ENV, 0)?),
        };
        if config.configured_backends() == 0 {
            warn!("No generation backend API key configured");
        }
        Ok(config)
    }

    /// Number of vendors with a key
    #[must_use]
    pub fn configured_backends(&self) -> usize {
        [
            &self.gemini_api_key,
            &self.openai_api_key,
            &self.anthropic_api_key,
        ]
        .into_iter()
        .filter(|key| key.is_some())
        .count()
    }
}

impl Debug for LlmConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("LlmConfig")
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Linkup web-search settings for fact-checking
#[derive(Clone, PartialEq, Eq)]
pub struct FactCheckConfig {
    /// Linkup API key; fact-checking is disabled without one
    pub api_key: Option<String>,
    /// Search depth (`standard` or `deep`)
    pub depth: String,
    /// Result shape (`searchResults`, `sourcedAnswer`)
    pub output_type: String,
}

impl Default for FactCheckConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            depth: "standard".to_owned(),
            output_type: "searchResults".to_owned(),
        }
    }
}

impl FactCheckConfig {
    /// API key variable
    pub const API_KEY_ENV: &'static str = "LINKUP_API_KEY";
    /// Depth variable
    pub const DEPTH_ENV: &'static str = "LINKUP_DEPTH";
    /// Output type variable
    pub const OUTPUT_TYPE_ENV: &'static str = "LINKUP_OUTPUT_TYPE";

    /// Load from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_optional(Self::API_KEY_ENV),
            depth: env_optional(Self::DEPTH_ENV).unwrap_or(defaults.depth),
            output_type: env_optional(Self::OUTPUT_TYPE_ENV).unwrap_or(defaults.output_type),
        }
    }
}

impl Debug for FactCheckConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactCheckConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("depth", &self.depth)
            .field("output_type", &self.output_type)
            .finish()
    }
}
