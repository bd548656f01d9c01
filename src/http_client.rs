use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Request, Response, StatusCode};
use std::time::Duration;

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::ApiError;

/// HTTP client for the Toggl Plan API with retry logic
pub struct PlanHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Attempt limit and backoff bounds
    retry: RetryPolicy,
}

impl PlanHttpClient {
    /// Create a new HTTP client
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
        })
    }

    /// Send one logical request and return the response body as text.
    ///
    /// Retries on:
    /// - network errors
    /// - 429
    /// - 5xx except 501
    ///
    /// 401 is terminal and maps to [`ApiError::Unauthorized`]; any other
    /// non-2xx final status maps to [`ApiError::HttpStatus`].
    pub async fn execute(&self, request: Request) -> Result<String, ApiError> {
        let url = request.url().clone();
        let response = self.send_with_retry(request).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %url, "Request rejected with 401");
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or("Unknown Status")
                .to_string();

            tracing::error!(
                status = status.as_u16(),
                url = %url,
                "HTTP request failed with error response"
            );
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::ResponseRead(e.to_string()))
    }

    /// Run attempts until a non-retryable outcome or the attempt limit.
    /// Returns the last response, whatever its status.
    async fn send_with_retry(&self, request: Request) -> Result<Response, ApiError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 0;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        loop {
            // Clone the request for this attempt
            let req = request.try_clone().ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!("Request body is not cloneable"))
            })?;

            tracing::debug!(
                attempt = attempt + 1,
                max_attempts = max_attempts,
                "Executing request attempt"
            );

            match self.client.execute(req).await {
                Ok(response) => {
                    let status = response.status();

                    tracing::debug!(status = %status, "Received HTTP response");

                    if !should_retry_status(status) {
                        return Ok(response);
                    }

                    if attempt + 1 >= max_attempts {
                        tracing::error!(
                            status = status.as_u16(),
                            url = %url,
                            total_attempts = attempt + 1,
                            "Giving up after retryable responses"
                        );
                        return Ok(response);
                    }

                    let delay = retry_after(status, response.headers())
                        .map(|d| self.retry.clamp(d))
                        .unwrap_or_else(|| self.retry.backoff_delay(attempt));

                    tracing::warn!(
                        "Received {}, retrying after {}ms (attempt {}/{})",
                        status,
                        delay.as_millis(),
                        attempt + 1,
                        max_attempts
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }

                Err(e) => {
                    // Categorize the error for better debugging
                    let error_kind = if e.is_timeout() {
                        "timeout"
                    } else if e.is_connect() {
                        "connection_failed"
                    } else if e.is_request() {
                        "request_error"
                    } else if e.is_body() {
                        "body_error"
                    } else {
                        "unknown"
                    };

                    tracing::warn!(
                        error_kind = error_kind,
                        error = %e,
                        url = %url,
                        attempt = attempt + 1,
                        "HTTP request error"
                    );

                    if attempt + 1 >= max_attempts {
                        tracing::error!(
                            error_kind = error_kind,
                            url = %url,
                            total_attempts = attempt + 1,
                            "HTTP request failed after all retries"
                        );

                        return Err(ApiError::TransportError(format!(
                            "{} {} giving up after {} attempt(s): {} (kind: {})",
                            method,
                            url,
                            attempt + 1,
                            e,
                            error_kind
                        )));
                    }

                    let delay = self.retry.backoff_delay(attempt);
                    tracing::warn!(
                        "Request failed: {}, retrying after {}ms (attempt {}/{})",
                        e,
                        delay.as_millis(),
                        attempt + 1,
                        max_attempts
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Whether a response status is worth another attempt
pub fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

/// Server-requested delay, honoured on 429 and 503 only
fn retry_after(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
    if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::SERVICE_UNAVAILABLE {
        return None;
    }

    let seconds: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(seconds))
}
