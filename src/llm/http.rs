// ABOUTME: HTTP client construction and retrying dispatch shared by the generation backends
// ABOUTME: Bounds blocking calls by a request timeout, streams by a per-read timeout, retries transients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use pierre_core::constants::generation::{
    CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, STREAM_READ_TIMEOUT_SECS,
};
use reqwest::{Client, RequestBuilder, Response};
use tokio::time::sleep;
use tracing::{error, warn};

use super::sse_parser::{is_retryable_request_error, is_retryable_status, RetryConfig};
use crate::errors::AppError;

/// Timeouts and retry policy for one backend client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Whole-request timeout for blocking calls, including reading the body
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Longest wait for the next read of a response body
    ///
    /// The only bound on a stream once its headers have arrived.
    pub read_timeout: Duration,
    /// Retry policy for the initial request
    pub retry: RetryConfig,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(STREAM_READ_TIMEOUT_SECS),
            retry: RetryConfig::disabled(),
        }
    }
}

impl HttpSettings {
    /// Override the request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the per-read timeout
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Override the retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build a rustls-backed client with the connect and per-read timeouts
    ///
    /// The request timeout is applied per call by [`send_with_retry`], so a
    /// long streamed answer is not cut off while chunks keep arriving.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the TLS backend cannot be initialised.
    pub fn build_client(&self) -> Result<Client, AppError> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))
    }
}

/// Map a transport failure onto the collaborator error codes
pub(crate) fn map_send_error(service: &str, error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::collaborator_unavailable(service, format!("request timed out: {error}"))
    } else if error.is_connect() {
        AppError::collaborator_unavailable(service, format!("cannot connect: {error}"))
    } else {
        AppError::external_service(service, format!("request failed: {error}"))
    }
}

/// Send a request, retrying transient failures per `settings.retry`
///
/// `build` is called once per attempt. Blocking calls are bounded by
/// `settings.request_timeout`; streaming calls only by the client's connect and
/// per-read timeouts. Non-success statuses that are not retryable, or that
/// exhaust the retries, are returned as `Ok` so the provider can map its own
/// error body.
pub(crate) async fn send_with_retry<B>(
    service: &str,
    settings: &HttpSettings,
    streaming: bool,
    build: B,
) -> Result<Response, AppError>
where
    B: Fn() -> RequestBuilder + Send + Sync,
{
    let retry = &settings.retry;
    let mut attempt = 0;
    loop {
        let can_retry = attempt < retry.max_retries;
        let request = if streaming {
            build()
        } else {
            build().timeout(settings.request_timeout)
        };
        match request.send().await {
            Ok(response) if can_retry && is_retryable_status(response.status().as_u16()) => {
                warn!(
                    service,
                    status = %response.status(),
                    attempt,
                    "Transient backend status, retrying"
                );
            }
            Ok(response) => return Ok(response),
            Err(e) if can_retry && is_retryable_request_error(&e) => {
                warn!(service, error = %e, attempt, "Transient transport error, retrying");
            }
            Err(e) => {
                error!(service, error = %e, "Backend request failed");
                return Err(map_send_error(service, &e));
            }
        }
        sleep(retry.delay_for_attempt(attempt)).await;
        attempt += 1;
    }
}
