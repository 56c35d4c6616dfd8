// ABOUTME: Integration tests for the unified error type
// ABOUTME: Code serialization, display format, collaborator classification and source chaining
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

use std::error::Error;

use pierre_coach::errors::{AppError, AppResult, ErrorCode};
use serde_json::json;

#[test]
fn test_error_codes_serialize_as_screaming_snake_case() {
    assert_eq!(
        serde_json::to_value(ErrorCode::MissingPlaceholder).unwrap(),
        json!("MISSING_PLACEHOLDER")
    );
    assert_eq!(
        serde_json::from_value::<ErrorCode>(json!("EXTERNAL_RATE_LIMITED")).unwrap(),
        ErrorCode::ExternalRateLimited
    );
}

#[test]
fn test_display_prefixes_code_description() {
    let error = AppError::not_found("User profile 'Bob'");
    assert_eq!(
        error.to_string(),
        "The requested resource was not found: User profile 'Bob' not found"
    );
}

#[test]
fn test_external_errors_name_the_service() {
    let error = AppError::external_service("Gemini", "quota exhausted");
    assert_eq!(error.message, "Gemini: quota exhausted");
    assert!(error.is_collaborator_failure());
    assert!(ErrorCode::ExternalAuthFailed.is_external());
    assert!(!ErrorCode::MalformedDecision.is_external());
}

#[test]
fn test_serde_errors_convert_with_source() {
    fn parse(raw: &str) -> AppResult<serde_json::Value> {
        Ok(serde_json::from_str(raw)?)
    }

    let error = parse("{").unwrap_err();
    assert_eq!(error.code, ErrorCode::SerializationError);
    assert!(error.source().is_some());
}

#[test]
fn test_context_builders() {
    let error = AppError::invalid_input("bad id")
        .with_resource_id("record-7")
        .with_details(json!({"field": "run_ids"}));

    assert_eq!(error.context.resource_id.as_deref(), Some("record-7"));
    assert_eq!(error.context.details["field"], "run_ids");
    assert!(AppError::empty_input("knee").missing_placeholder_names().is_empty());
}
