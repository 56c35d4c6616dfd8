// ABOUTME: Unit tests for the generation backend layer
// ABOUTME: Capabilities, request building, backend metadata and the model registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Test files don't require documentation - this is a rustc lint (not clippy)
#![allow(missing_docs)]

mod common;

use std::str::FromStr;
use std::time::Duration;

use pierre_coach::config::LlmConfig;
use pierre_coach::errors::ErrorCode;
use pierre_coach::llm::sse_parser::RetryConfig;
use pierre_coach::llm::{
    collect_stream, AnthropicProvider, ChatMessage, ChatRequest, GeminiProvider, HttpSettings,
    LlmCapabilities, LlmProvider, MessageRole, ModelId, ModelRegistry, OpenAiCompatibleConfig,
    OpenAiCompatibleProvider, ProviderKind, ResponseFormat,
};
use serde_json::json;

// ============================================================================
// Capabilities and requests
// ============================================================================

#[test]
fn test_text_only_capabilities() {
    let caps = LlmCapabilities::text_only();
    assert!(caps.supports_streaming());
    assert!(caps.supports_system_messages());
    assert!(!caps.supports_json_schema());
    assert!(!caps.supports_temperature());
}

#[test]
fn test_full_featured_capabilities() {
    let caps = LlmCapabilities::full_featured();
    assert!(caps.supports_json_schema());
    assert!(caps.supports_temperature());
}

#[test]
fn test_message_roles() {
    assert_eq!(ChatMessage::system("s").role, MessageRole::System);
    assert_eq!(ChatMessage::user("u").role, MessageRole::User);
    assert_eq!(ChatMessage::assistant("a").role, MessageRole::Assistant);
    assert_eq!(MessageRole::Assistant.as_str(), "assistant");
}

#[test]
fn test_request_builder_sets_answer_options() {
    let request = ChatRequest::from_prompt("How was my run?")
        .with_model("gemini-2.0-flash")
        .with_temperature(1.0)
        .with_max_tokens(512)
        .with_streaming();

    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, MessageRole::User);
    assert_eq!(request.model.as_deref(), Some("gemini-2.0-flash"));
    assert_eq!(request.max_tokens, Some(512));
    assert!(request.stream);
    assert!(request.temperature.is_some());
}

#[test]
fn test_json_schema_request() {
    let request = ChatRequest::from_prompt("route")
        .with_json_schema("retrieval_decision", json!({"type": "object"}));
    match request.response_format {
        Some(ResponseFormat::JsonSchema { name, .. }) => assert_eq!(name, "retrieval_decision"),
        other => panic!("unexpected format {other:?}"),
    }
}

// ============================================================================
// Backends
// ============================================================================

#[test]
fn test_gemini_metadata_and_redaction() {
    let provider = GeminiProvider::new("secret-gemini-key", &HttpSettings::default()).unwrap();
    assert_eq!(provider.name(), "gemini");
    assert!(provider.capabilities().supports_json_schema());
    assert!(provider
        .available_models()
        .contains(&ModelId::Gemini20Flash.as_str()));
    assert!(!format!("{provider:?}").contains("secret-gemini-key"));
}

#[test]
fn test_gemini_custom_default_model() {
    let provider = GeminiProvider::new("k", &HttpSettings::default())
        .unwrap()
        .with_default_model("gemini-2.0-flash");
    assert_eq!(provider.default_model(), "gemini-2.0-flash");
}

#[test]
fn test_openai_metadata_and_redaction() {
    let config = OpenAiCompatibleConfig::openai("sk-secret");
    assert!(!format!("{config:?}").contains("sk-secret"));

    let provider = OpenAiCompatibleProvider::new(config, &HttpSettings::default()).unwrap();
    assert_eq!(provider.name(), "openai");
    assert!(provider.capabilities().supports_temperature());
}

#[test]
fn test_local_endpoint_lacks_schema_support() {
    let config = OpenAiCompatibleConfig::local(None, "llama3.1:8b");
    assert!(config.api_key.is_none());
    assert!(config.capabilities.supports_temperature());
    assert!(!config.capabilities.supports_json_schema());
}

#[test]
fn test_anthropic_metadata_and_redaction() {
    let provider = AnthropicProvider::new("anthropic-secret", &HttpSettings::default()).unwrap();
    assert_eq!(provider.name(), "anthropic");
    assert!(!format!("{provider:?}").contains("anthropic-secret"));
}

// ============================================================================
// Model identifiers and registry
// ============================================================================

#[test]
fn test_model_ids_parse_case_insensitively() {
    assert_eq!(ModelId::from_str("O4-MINI").unwrap(), ModelId::O4Mini);
    assert_eq!(
        ModelId::from_str(" gemini-2.0-flash ").unwrap(),
        ModelId::Gemini20Flash
    );
    assert_eq!(
        ModelId::from_str("gpt-2").unwrap_err().code,
        ErrorCode::InvalidInput
    );
}

#[test]
fn test_model_ids_serialize_as_wire_names() {
    assert_eq!(
        serde_json::to_value(ModelId::Claude37Sonnet).unwrap(),
        json!("claude-3-7-sonnet-20250219")
    );
    assert_eq!(ModelId::Gpt41.provider_kind(), ProviderKind::OpenAi);
}

#[test]
fn test_registry_from_config_registers_vendor_models() {
    let config = LlmConfig {
        gemini_api_key: Some("g".to_owned()),
        ..LlmConfig::default()
    };
    let registry = ModelRegistry::from_config(&config).unwrap();

    assert_eq!(
        registry.models(),
        [ModelId::Gemini25FlashPreview, ModelId::Gemini20Flash]
    );
    assert!(!registry.contains(ModelId::O4Mini));
    assert_eq!(
        registry.get(ModelId::O4Mini).err().unwrap().code,
        ErrorCode::ConfigMissing
    );
}

#[test]
fn test_http_settings_follow_config() {
    let config = LlmConfig {
        request_timeout: Duration::from_secs(15),
        retry: RetryConfig::with_max_retries(1),
        ..LlmConfig::default()
    };
    let settings = config.http_settings();
    assert_eq!(settings.request_timeout, Duration::from_secs(15));
    assert_eq!(settings.retry.max_retries, 1);
}

#[tokio::test]
async fn test_registry_routes_requests_with_model_name() {
    common::init_test_logging();
    let backend = common::ScriptedProvider::replying("ok");
    let registry = ModelRegistry::new().with_model(ModelId::Gpt41, backend.clone());

    let response = registry
        .complete(ModelId::Gpt41, ChatRequest::from_prompt("hi"))
        .await
        .unwrap();

    assert_eq!(response.content, "ok");
    assert_eq!(backend.requests()[0].model.as_deref(), Some("gpt-4.1"));
}

#[tokio::test]
async fn test_registry_stream_sets_streaming_flag() {
    let backend = common::ScriptedProvider::replying("land softly");
    let registry = ModelRegistry::new().with_model(ModelId::Gemini20Flash, backend.clone());

    let stream = registry
        .stream(ModelId::Gemini20Flash, ChatRequest::from_prompt("hi"))
        .await
        .unwrap();
    let text = collect_stream(stream).await.unwrap();

    assert_eq!(text, "land softly");
    assert!(backend.requests()[0].stream);
}
