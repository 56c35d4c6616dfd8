// ABOUTME: Google Gemini generation backend with streaming and schema-constrained output
// ABOUTME: Talks to the Generative Language API generateContent and streamGenerateContent methods
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Gemini Provider
//!
//! Implementation of [`LlmProvider`] for Google's Gemini models. The coach
//! uses Gemini for the final answer and for record and session summaries.
//!
//! ## Configuration
//!
//! `GEMINI_API_KEY` holds the key from Google AI Studio.
//!
//! ## Structured output
//!
//! A [`ResponseFormat::JsonSchema`] becomes `response_mime_type:
//! application/json` plus `response_schema`. Gemini rejects
//! `additionalProperties`, so it is stripped from the schema first.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use pierre_core::constants::service_names::GEMINI;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::http::{send_with_retry, HttpSettings};
use super::sse_parser::create_sse_stream;
use super::{
    ChatMessage, ChatRequest, ChatResponse, ChatStream, LlmCapabilities, LlmProvider, MessageRole,
    ResponseFormat, StreamChunk, TokenUsage,
};
use crate::errors::{AppError, ErrorCode};

/// Environment variable for Gemini API key
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default model to use
const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Gemini models the coach is configured for
const AVAILABLE_MODELS: &[&str] = &["gemini-2.5-flash-preview-04-17", "gemini-2.0-flash"];

/// Base URL for the Gemini API
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    total: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(ToOwned::to_owned),
            parts: vec![TextPart {
                text: Some(text.to_owned()),
            }],
        }
    }

    /// Concatenated text of every part
    fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(GeminiContent::joined_text)
            .unwrap_or_default()
    }
}

/// Copy of `schema` without `additionalProperties` at any depth
fn gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != "additionalProperties")
                .map(|(key, value)| (key.clone(), gemini_schema(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(gemini_schema).collect()),
        other => other.clone(),
    }
}

/// Parse one `alt=sse` payload
fn parse_stream_payload(payload: &str) -> Option<Result<StreamChunk, AppError>> {
    match serde_json::from_str::<GeminiResponse>(payload) {
        Ok(response) => {
            if let Some(error) = response.error {
                return Some(Err(AppError::external_service(GEMINI, error.message)));
            }
            let candidate = response.candidates?.into_iter().next()?;
            let is_final = candidate.finish_reason.is_some();
            Some(Ok(StreamChunk {
                delta: candidate.text(),
                is_final,
                finish_reason: candidate.finish_reason,
            }))
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse Gemini streaming chunk");
            None
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Google Gemini generation backend
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    base_url: String,
    default_model: String,
    http: HttpSettings,
}

impl GeminiProvider {
    /// Create a provider with an API key and HTTP settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, settings: &HttpSettings) -> Result<Self, AppError> {
        Ok(Self {
            api_key: api_key.into(),
            client: settings.build_client()?,
            base_url: API_BASE_URL.to_owned(),
            default_model: DEFAULT_MODEL.to_owned(),
            http: *settings,
        })
    }

    /// Create a provider from the `GEMINI_API_KEY` environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set.
    pub fn from_env(settings: &HttpSettings) -> Result<Self, AppError> {
        let api_key = env::var(GEMINI_API_KEY_ENV).map_err(|_| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("{GEMINI_API_KEY_ENV} environment variable not set"),
            )
        })?;
        Self::new(api_key, settings)
    }

    /// Set a custom default model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Point the provider at another API root (proxies, test servers)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Gemini's role names
    const fn convert_role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::System | MessageRole::User => "user",
            MessageRole::Assistant => "model",
        }
    }

    fn build_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    fn convert_messages(messages: &[ChatMessage]) -> (Vec<GeminiContent>, Option<GeminiContent>) {
        let mut contents = Vec::new();
        let mut system_parts = Vec::new();

        for message in messages {
            if message.role == MessageRole::System {
                system_parts.push(message.content.as_str());
            } else {
                contents.push(GeminiContent::text(
                    Some(Self::convert_role(message.role)),
                    &message.content,
                ));
            }
        }

        let system_instruction =
            (!system_parts.is_empty()).then(|| GeminiContent::text(None, &system_parts.join("\n\n")));
        (contents, system_instruction)
    }

    fn build_gemini_request(request: &ChatRequest) -> GeminiRequest {
        let (contents, system_instruction) = Self::convert_messages(&request.messages);

        let mut config = GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            ..GenerationConfig::default()
        };
        if let Some(ResponseFormat::JsonSchema { schema, .. }) = &request.response_format {
            config.response_mime_type = Some("application/json");
            config.response_schema = Some(gemini_schema(schema));
        }
        let has_config = config.temperature.is_some()
            || config.max_output_tokens.is_some()
            || config.response_schema.is_some();
        if has_config {
            config.candidate_count = Some(1);
        }

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: has_config.then_some(config),
        }
    }

    fn convert_usage(metadata: &UsageMetadata) -> TokenUsage {
        TokenUsage {
            prompt_tokens: metadata.prompt.unwrap_or(0),
            completion_tokens: metadata.candidates.unwrap_or(0),
            total_tokens: metadata.total.unwrap_or(0),
        }
    }

    /// Map an error status onto the collaborator error codes
    fn map_api_error(status: u16, response_text: &str) -> AppError {
        let message = serde_json::from_str::<GeminiResponse>(response_text)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| response_text.to_owned(), |e| e.message);

        match status {
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                format!("{GEMINI} quota exceeded: {message}"),
            ),
            401 | 403 => AppError::new(
                ErrorCode::ExternalAuthFailed,
                format!("{GEMINI} rejected the API key: {message}"),
            ),
            502..=504 => AppError::collaborator_unavailable(GEMINI, message),
            _ => AppError::external_service(GEMINI, format!("API error ({status}): {message}")),
        }
    }

    async fn post(
        &self,
        model: &str,
        method: &str,
        body: &GeminiRequest,
        streaming: bool,
    ) -> Result<Response, AppError> {
        let url = self.build_url(model, method);
        let response = send_with_retry(GEMINI, &self.http, streaming, || {
            let builder = self.client.post(&url).query(&[("key", self.api_key.as_str())]);
            let builder = if streaming {
                builder.query(&[("alt", "sse")])
            } else {
                builder
            };
            builder.json(body)
        })
        .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        error!(status = %status, "Gemini API error");
        Err(Self::map_api_error(status.as_u16(), &text))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Google Gemini"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn available_models(&self) -> &'static [&'static str] {
        AVAILABLE_MODELS
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = Self::build_gemini_request(request);

        debug!("Sending request to Gemini API");
        let response = self.post(model, "generateContent", &body, false).await?;
        let response_text = response.text().await.map_err(|e| {
            AppError::external_service(GEMINI, format!("Failed to read response: {e}"))
        })?;

        let gemini_response: GeminiResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                error!(error = %e, "Failed to parse Gemini response");
                AppError::external_service(GEMINI, format!("Failed to parse response: {e}"))
            })?;

        if let Some(error) = gemini_response.error {
            return Err(AppError::external_service(GEMINI, error.message));
        }

        let candidate = gemini_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| AppError::external_service(GEMINI, "No candidates in response"))?;

        Ok(ChatResponse {
            content: candidate.text(),
            model: model.to_owned(),
            usage: gemini_response
                .usage_metadata
                .as_ref()
                .map(Self::convert_usage),
            finish_reason: candidate.finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.default_model)))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = Self::build_gemini_request(request);

        debug!("Starting streaming request to Gemini API");
        let response = self
            .post(model, "streamGenerateContent", &body, true)
            .await?;

        Ok(create_sse_stream(
            response.bytes_stream(),
            parse_stream_payload,
            GEMINI,
        ))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::external_service(GEMINI, format!("Health check failed: {e}")))?;

        Ok(response.status().is_success())
    }
}

impl Debug for GeminiProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiProvider")
            .field("default_model", &self.default_model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
