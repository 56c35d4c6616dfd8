// ABOUTME: Anthropic Messages API generation backend with streaming through the shared SSE parser
// ABOUTME: Uses x-api-key and anthropic-version headers; schema constraints become system instructions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Anthropic Provider
//!
//! Implementation of [`LlmProvider`] for Claude models over `/v1/messages`.
//!
//! The Messages API takes the system prompt as a top-level field and requires
//! `max_tokens`. It has no native JSON-schema output mode, so a
//! [`ResponseFormat::JsonSchema`] is appended to the system prompt as an
//! instruction.
//!
//! ## Configuration
//!
//! `ANTHROPIC_API_KEY` holds the key.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use pierre_core::constants::service_names::ANTHROPIC;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::http::{send_with_retry, HttpSettings};
use super::sse_parser::create_sse_stream;
use super::{
    ChatRequest, ChatResponse, ChatStream, LlmCapabilities, LlmProvider, MessageRole,
    ResponseFormat, StreamChunk, TokenUsage,
};
use crate::errors::{AppError, ErrorCode};

/// Environment variable for the Anthropic API key
const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Default API root
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Messages API version header value
const API_VERSION: &str = "2023-06-01";

/// Default model to use
const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Claude models the coach is configured for
const AVAILABLE_MODELS: &[&str] = &["claude-3-7-sonnet-20250219"];

/// `max_tokens` sent when the request does not set one
const DEFAULT_MAX_TOKENS: u32 = 8192;

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Streaming events; only the ones that carry output are modelled
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    MessageDelta { delta: MessageDeltaBody },
    MessageStop,
    Error { error: AnthropicErrorDetail },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaBody {
    stop_reason: Option<String>,
}

/// Parse one streamed event payload
fn parse_stream_payload(payload: &str) -> Option<Result<StreamChunk, AppError>> {
    let event = match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Failed to parse Anthropic stream event");
            return None;
        }
    };
    match event {
        StreamEvent::ContentBlockDelta {
            delta: BlockDelta::TextDelta { text },
        } => Some(Ok(StreamChunk::text(text))),
        StreamEvent::MessageDelta { delta } => delta.stop_reason.map(|reason| Ok(StreamChunk::done(reason))),
        StreamEvent::MessageStop => Some(Ok(StreamChunk::done("end_turn"))),
        StreamEvent::Error { error } => {
            Some(Err(AppError::external_service(ANTHROPIC, error.message)))
        }
        StreamEvent::ContentBlockDelta { .. } | StreamEvent::Other => None,
    }
}

/// System prompt with any schema instruction appended
fn system_prompt(request: &ChatRequest) -> Option<String> {
    let schema_instruction = request.response_format.as_ref().map(|format| match format {
        ResponseFormat::JsonSchema { schema, .. } => format!(
            "Respond with a single JSON object and nothing else. It must satisfy this JSON Schema:\n{schema}"
        ),
    });
    match (request.system_text(), schema_instruction) {
        (Some(system), Some(instruction)) => Some(format!("{system}\n\n{instruction}")),
        (system, instruction) => system.or(instruction),
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Anthropic Claude generation backend
pub struct AnthropicProvider {
    api_key: String,
    client: Client,
    base_url: String,
    default_model: String,
    http: HttpSettings,
}

impl AnthropicProvider {
    /// Create a provider with an API key and HTTP settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, settings: &HttpSettings) -> Result<Self, AppError> {
        Ok(Self {
            api_key: api_key.into(),
            client: settings.build_client()?,
            base_url: DEFAULT_BASE_URL.to_owned(),
            default_model: DEFAULT_MODEL.to_owned(),
            http: *settings,
        })
    }

    /// Create a provider from the `ANTHROPIC_API_KEY` environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set.
    pub fn from_env(settings: &HttpSettings) -> Result<Self, AppError> {
        let api_key = env::var(ANTHROPIC_API_KEY_ENV).map_err(|_| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("{ANTHROPIC_API_KEY_ENV} environment variable not set"),
            )
        })?;
        Self::new(api_key, settings)
    }

    /// Point the provider at another API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> MessagesRequest {
        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: if m.role == MessageRole::Assistant {
                    "assistant"
                } else {
                    "user"
                },
                content: m.content.clone(),
            })
            .collect();

        MessagesRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            system: system_prompt(request),
            temperature: request.temperature,
            stream,
        }
    }

    fn map_api_error(status: u16, body: &str) -> AppError {
        let message = serde_json::from_str::<AnthropicErrorResponse>(body)
            .map_or_else(|_| body.chars().take(200).collect(), |r| r.error.message);
        match status {
            401 | 403 => AppError::new(
                ErrorCode::ExternalAuthFailed,
                format!("{ANTHROPIC} rejected the API key: {message}"),
            ),
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                format!("{ANTHROPIC} rate limit reached: {message}"),
            ),
            // 529 is Anthropic's overloaded status
            502..=504 | 529 => AppError::collaborator_unavailable(ANTHROPIC, message),
            _ => AppError::external_service(ANTHROPIC, format!("API error ({status}): {message}")),
        }
    }

    async fn post_messages(&self, body: &MessagesRequest) -> Result<Response, AppError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = send_with_retry(ANTHROPIC, &self.http, body.stream, || {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(body)
        })
        .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        error!(status = %status, "Anthropic API error");
        Err(Self::map_api_error(status.as_u16(), &text))
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn display_name(&self) -> &'static str {
        "Anthropic Claude"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::text_only().union(LlmCapabilities::TEMPERATURE)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn available_models(&self) -> &'static [&'static str] {
        AVAILABLE_MODELS
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let body = self.build_request(request, false);
        debug!("Sending request to Anthropic Messages API");
        let response = self.post_messages(&body).await?;

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            AppError::external_service(ANTHROPIC, format!("Failed to parse response: {e}"))
        })?;

        let content = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<String>();

        Ok(ChatResponse {
            content,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            finish_reason: parsed.stop_reason,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.default_model)))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        let body = self.build_request(request, true);
        let response = self.post_messages(&body).await?;
        Ok(create_sse_stream(
            response.bytes_stream(),
            parse_stream_payload,
            ANTHROPIC,
        ))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await
            .map_err(|e| {
                AppError::external_service(ANTHROPIC, format!("Health check failed: {e}"))
            })?;
        Ok(response.status().is_success())
    }
}

impl Debug for AnthropicProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnthropicProvider")
            .field("default_model", &self.default_model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
