// ABOUTME: Integration tests for logging configuration
// ABOUTME: Environment-driven format selection, production defaults and noise filtering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

use std::env;

use pierre_coach::config::Environment;
use pierre_coach::logging::{LogFormat, LoggingConfig};
use serial_test::serial;

const LOGGING_VARS: [&str; 9] = [
    "RUST_LOG",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "ENVIRONMENT",
    "SERVICE_NAME",
    "SERVICE_VERSION",
    "LOG_INCLUDE_LOCATION",
    "LOG_INCLUDE_THREAD",
    "LOG_INCLUDE_SPANS",
];

fn clear_env() {
    for var in LOGGING_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_production_defaults_to_json_with_locations() {
    clear_env();
    env::set_var("RUST_LOG", "debug");
    env::set_var("ENVIRONMENT", "production");
    env::set_var("SERVICE_NAME", "coach-test");

    let config = LoggingConfig::from_env();

    assert_eq!(config.level, "debug");
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.service_name, "coach-test");
    assert!(config.include_location);
    assert!(config.include_spans);
    clear_env();
}

#[test]
#[serial]
fn test_explicit_format_wins_over_environment() {
    clear_env();
    env::set_var("ENVIRONMENT", "production");
    env::set_var("LOG_FORMAT", "compact");

    assert_eq!(LoggingConfig::from_env().format, LogFormat::Compact);
    clear_env();
}

#[test]
#[serial]
fn test_development_defaults() {
    clear_env();

    let config = LoggingConfig::from_env();

    assert_eq!(config.level, "info");
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.service_name, "pierre-coach");
    assert!(!config.include_location);
    assert!(!config.include_thread);
}

#[test]
#[serial]
fn test_opt_in_flags_in_development() {
    clear_env();
    env::set_var("LOG_INCLUDE_THREAD", "1");

    let config = LoggingConfig::from_env();

    assert!(config.include_thread);
    assert!(!config.include_location);
    clear_env();
}

#[test]
#[serial]
fn test_log_level_used_without_rust_log() {
    clear_env();
    env::set_var("LOG_LEVEL", "WARN");
    assert_eq!(LoggingConfig::from_env().level, "warn");

    env::set_var("LOG_LEVEL", "chatty");
    assert_eq!(LoggingConfig::from_env().level, "info");

    env::set_var("RUST_LOG", "pierre_coach=trace");
    assert_eq!(LoggingConfig::from_env().level, "pierre_coach=trace");
    clear_env();
}

#[test]
fn test_noisy_crates_capped_at_warn() {
    let config = LoggingConfig {
        level: "trace".into(),
        ..LoggingConfig::default()
    };
    let filter = config.env_filter().to_string();

    assert!(filter.contains("trace"));
    assert!(filter.contains("hyper=warn"));
    assert!(filter.contains("rustls=warn"));
}
