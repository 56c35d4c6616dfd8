// ABOUTME: Linkup search client used to fact-check coaching advice against academic literature
// ABOUTME: Bearer-authenticated POST to /v1/search with depth, output type and a domain allow-list
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use pierre_core::constants::service_names::LINKUP;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::FactChecker;
use crate::config::FactCheckConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::llm::http::send_with_retry;
use crate::llm::HttpSettings;

/// Linkup API base URL
const DEFAULT_BASE_URL: &str = "https://api.linkup.so/v1";

/// Academic sources searches are restricted to
pub const ACADEMIC_DOMAINS: [&str; 10] = [
    "pubmed.ncbi.nlm.nih.gov",
    "link.springer.com",
    "www.researchgate.net",
    "www.semanticscholar.org",
    "www.doaj.org",
    "journals.humankinetics.com",
    "bjsm.bmj.com",
    "www.academia.edu",
    "arxiv.org",
    "www.jstage.jst.go.jp",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    q: &'a str,
    depth: &'a str,
    output_type: &'a str,
    include_domains: &'a [&'static str],
}

/// Fact checker backed by the Linkup search API
pub struct LinkupFactChecker {
    api_key: String,
    depth: String,
    output_type: String,
    base_url: String,
    client: Client,
    http: HttpSettings,
}

impl LinkupFactChecker {
    /// Create a checker from configuration
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_MISSING` without an API key, or an internal error if the
    /// HTTP client cannot be built.
    pub fn new(config: &FactCheckConfig, settings: &HttpSettings) -> AppResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("{} environment variable not set", FactCheckConfig::API_KEY_ENV),
            )
        })?;
        Ok(Self {
            api_key,
            depth: config.depth.clone(),
            output_type: config.output_type.clone(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            client: settings.build_client()?,
            http: *settings,
        })
    }

    /// Point at a different endpoint (mock servers, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn map_api_error(status: u16, body: &str) -> AppError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .or_else(|| v.get("message"))
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned)
            })
            .unwrap_or_else(|| body.to_owned());

        match status {
            401 | 403 => AppError::new(
                ErrorCode::ExternalAuthFailed,
                format!("{LINKUP} rejected the API key: {message}"),
            ),
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                format!("{LINKUP} rate limit reached: {message}"),
            ),
            502..=504 => AppError::collaborator_unavailable(LINKUP, message),
            _ => AppError::external_service(LINKUP, format!("API error ({status}): {message}")),
        }
    }
}

impl Debug for LinkupFactChecker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkupFactChecker")
            .field("api_key", &"[REDACTED]")
            .field("depth", &self.depth)
            .field("output_type", &self.output_type)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FactChecker for LinkupFactChecker {
    fn name(&self) -> &'static str {
        LINKUP
    }

    #[instrument(skip(self, query), fields(depth = %self.depth, output_type = %self.output_type))]
    async fn search(&self, query: &str) -> AppResult<Value> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            q: query,
            depth: &self.depth,
            output_type: &self.output_type,
            include_domains: &ACADEMIC_DOMAINS,
        };

        let response = send_with_retry(LINKUP, &self.http, false, || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::external_service(LINKUP, format!("failed to read response: {e}")))?;

        if !status.is_success() {
            error!(status = %status, "Linkup search failed");
            return Err(Self::map_api_error(status.as_u16(), &text));
        }

        let payload: Value = serde_json::from_str(&text).map_err(|e| {
            AppError::external_service(LINKUP, format!("invalid JSON response: {e}"))
        })?;
        debug!(bytes = text.len(), "Linkup search succeeded");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_linkup_field_names() {
        let body = serde_json::to_value(SearchRequest {
            q: "knee pain",
            depth: "standard",
            output_type: "searchResults",
            include_domains: &ACADEMIC_DOMAINS,
        })
        .unwrap();
        assert_eq!(body["outputType"], "searchResults");
        assert_eq!(body["includeDomains"][0], "pubmed.ncbi.nlm.nih.gov");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let error = LinkupFactChecker::new(&FactCheckConfig::default(), &HttpSettings::default())
            .err()
            .unwrap();
        assert_eq!(error.code, ErrorCode::ConfigMissing);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            LinkupFactChecker::map_api_error(401, "{}").code,
            ErrorCode::ExternalAuthFailed
        );
        assert_eq!(
            LinkupFactChecker::map_api_error(503, "down").code,
            ErrorCode::ExternalServiceUnavailable
        );
    }
}
