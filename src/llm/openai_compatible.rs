// ABOUTME: OpenAI chat-completions generation backend, usable for OpenAI cloud and compatible servers
// ABOUTME: Bearer auth, json_schema response format, and SSE streaming through the shared parser
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI`-Compatible Provider
//!
//! Implementation of [`LlmProvider`] for the `chat/completions` API. The coach
//! uses it for the retrieval router (`o4-mini`) and as an alternative answer
//! model (`gpt-4.1`). The same wire format is served by Ollama, vLLM and
//! `LocalAI`, so [`OpenAiCompatibleConfig::local`] points it at those.
//!
//! ## Configuration
//!
//! `OPENAI_API_KEY` holds the key for the `OpenAI` cloud preset.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use pierre_core::constants::service_names::OPENAI;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, instrument, warn};

use super::http::{send_with_retry, HttpSettings};
use super::sse_parser::create_sse_stream;
use super::{
    ChatMessage, ChatRequest, ChatResponse, ChatStream, LlmCapabilities, LlmProvider,
    ResponseFormat, StreamChunk, TokenUsage,
};
use crate::errors::{AppError, ErrorCode};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Environment variable for the `OpenAI` API key
const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// `OpenAI` cloud endpoint
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for the cloud preset
const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Models the coach is configured for on `OpenAI`
const OPENAI_MODELS: &[&str] = &["gpt-4.1", "o4-mini"];

/// Default base URL for local servers (Ollama)
const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(rename = "prompt_tokens")]
    prompt: u32,
    #[serde(rename = "completion_tokens")]
    completion: u32,
    #[serde(rename = "total_tokens")]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// `response_format` body for a schema constraint
fn response_format_body(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::JsonSchema { name, schema } => json!({
            "type": "json_schema",
            "json_schema": {
                "name": name,
                "schema": schema,
                "strict": true,
            }
        }),
    }
}

/// Parse one streamed `chat.completion.chunk`
fn parse_stream_payload(payload: &str) -> Option<Result<StreamChunk, AppError>> {
    match serde_json::from_str::<OpenAiStreamChunk>(payload) {
        Ok(chunk) => {
            let choice = chunk.choices.into_iter().next()?;
            Some(Ok(StreamChunk {
                delta: choice.delta.content.unwrap_or_default(),
                is_final: choice.finish_reason.is_some(),
                finish_reason: choice.finish_reason,
            }))
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse OpenAI stream chunk");
            None
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Request field carrying the output token limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLimitField {
    /// Legacy `max_tokens`, still expected by most local servers
    MaxTokens,
    /// `max_completion_tokens`, required by `OpenAI` reasoning models
    MaxCompletionTokens,
}

/// Configuration for the `OpenAI`-compatible provider
#[derive(Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL for the API (e.g., <https://api.openai.com/v1>)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Default model to use
    pub default_model: String,
    /// Provider name for logging
    pub provider_name: &'static str,
    /// Provider display name
    pub display_name: &'static str,
    /// Capabilities of this endpoint
    pub capabilities: LlmCapabilities,
    /// Field the output token limit is sent in
    pub token_limit_field: TokenLimitField,
}

impl OpenAiCompatibleConfig {
    /// `OpenAI` cloud with the given key
    #[must_use]
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_owned(),
            api_key: Some(api_key.into()),
            default_model: DEFAULT_OPENAI_MODEL.to_owned(),
            provider_name: "openai",
            display_name: "OpenAI",
            capabilities: LlmCapabilities::full_featured(),
            token_limit_field: TokenLimitField::MaxCompletionTokens,
        }
    }

    /// A local `OpenAI`-compatible server (Ollama by default)
    #[must_use]
    pub fn local(base_url: Option<&str>, model: &str) -> Self {
        Self {
            base_url: base_url.unwrap_or(DEFAULT_LOCAL_BASE_URL).to_owned(),
            api_key: None,
            default_model: model.to_owned(),
            provider_name: "local",
            display_name: "Local LLM",
            capabilities: LlmCapabilities::text_only().union(LlmCapabilities::TEMPERATURE),
            token_limit_field: TokenLimitField::MaxTokens,
        }
    }
}

impl Debug for OpenAiCompatibleConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiCompatibleConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("default_model", &self.default_model)
            .field("provider_name", &self.provider_name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Generic `OpenAI`-compatible generation backend
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
    http: HttpSettings,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig, settings: &HttpSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: settings.build_client()?,
            config,
            http: *settings,
        })
    }

    /// `OpenAI` cloud provider from the `OPENAI_API_KEY` environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or the client cannot be built.
    pub fn openai_from_env(settings: &HttpSettings) -> Result<Self, AppError> {
        let api_key = env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::new(
                    ErrorCode::ConfigMissing,
                    format!("{OPENAI_API_KEY_ENV} environment variable not set"),
                )
            })?;
        Self::new(OpenAiCompatibleConfig::openai(api_key), settings)
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> OpenAiRequest {
        let temperature = request
            .temperature
            .filter(|_| self.config.capabilities.supports_temperature());
        if temperature.is_none() && request.temperature.is_some() {
            debug!(
                provider = self.config.provider_name,
                "Dropping temperature unsupported by endpoint"
            );
        }
        OpenAiRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
            messages: request.messages.iter().map(OpenAiMessage::from).collect(),
            temperature,
            max_tokens: request
                .max_tokens
                .filter(|_| self.config.token_limit_field == TokenLimitField::MaxTokens),
            max_completion_tokens: request
                .max_tokens
                .filter(|_| self.config.token_limit_field == TokenLimitField::MaxCompletionTokens),
            stream: Some(stream),
            response_format: request.response_format.as_ref().map(response_format_body),
        }
    }

    /// Parse error response from API
    fn parse_error_response(status: StatusCode, body: &str) -> AppError {
        let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) else {
            return match status.as_u16() {
                502..=504 => AppError::collaborator_unavailable(
                    OPENAI,
                    format!("server not responding ({status})"),
                ),
                _ => AppError::external_service(
                    OPENAI,
                    format!(
                        "API error ({status}): {}",
                        body.chars().take(200).collect::<String>()
                    ),
                ),
            };
        };

        let message = error_response.error.message;
        match status.as_u16() {
            401 | 403 => AppError::new(
                ErrorCode::ExternalAuthFailed,
                format!("{OPENAI} authentication failed: {message}"),
            ),
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                format!("{OPENAI} rate limit reached: {message}"),
            ),
            400 => AppError::invalid_input(format!("{OPENAI} rejected the request: {message}")),
            404 => AppError::not_found(format!("Model or endpoint ({message})")),
            503 => AppError::collaborator_unavailable(OPENAI, message),
            _ => AppError::external_service(
                OPENAI,
                format!(
                    "{} - {message}",
                    error_response
                        .error
                        .error_type
                        .as_deref()
                        .unwrap_or("unknown")
                ),
            ),
        }
    }

    /// Add authorization header if API key is configured
    fn add_auth_header(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => request.bearer_auth(api_key),
            None => request,
        }
    }

    async fn post_chat(&self, body: &OpenAiRequest) -> Result<Response, AppError> {
        let url = self.api_url("chat/completions");
        debug!(
            provider = self.config.provider_name,
            messages = body.messages.len(),
            structured = body.response_format.is_some(),
            "Sending chat completion request"
        );
        let response = send_with_retry(OPENAI, &self.http, body.stream == Some(true), || {
            self.add_auth_header(self.client.post(&url).json(body))
        })
        .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        error!(status = %status, provider = self.config.provider_name, "Chat completion failed");
        Err(Self::parse_error_response(status, &text))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        self.config.provider_name
    }

    fn display_name(&self) -> &'static str {
        self.config.display_name
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.config.capabilities
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    fn available_models(&self) -> &'static [&'static str] {
        OPENAI_MODELS
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let body = self.build_request(request, false);
        let response = self.post_chat(&body).await?;

        let text = response.text().await.map_err(|e| {
            AppError::external_service(OPENAI, format!("Failed to read response: {e}"))
        })?;
        let openai_response: OpenAiResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "Failed to parse chat completion response");
            AppError::external_service(OPENAI, format!("Failed to parse response: {e}"))
        })?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service(OPENAI, "API returned no choices"))?;

        let content = choice.message.content.unwrap_or_default();
        debug!(
            chars = content.len(),
            finish_reason = ?choice.finish_reason,
            "Received chat completion"
        );

        Ok(ChatResponse {
            content,
            model: openai_response.model,
            usage: openai_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt,
                completion_tokens: u.completion,
                total_tokens: u.total,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        let body = self.build_request(request, true);
        let response = self.post_chat(&body).await?;
        Ok(create_sse_stream(
            response.bytes_stream(),
            parse_stream_payload,
            OPENAI,
        ))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        let response = self
            .add_auth_header(self.client.get(self.api_url("models")))
            .send()
            .await
            .map_err(|e| AppError::external_service(OPENAI, format!("Health check failed: {e}")))?;

        let healthy = response.status().is_success();
        if !healthy {
            warn!(status = %response.status(), "{} health check failed", self.config.display_name);
        }
        Ok(healthy)
    }
}

impl Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
