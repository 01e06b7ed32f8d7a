//! REST client for the execution broker.
//!
//! Wraps `POST /run`, `POST /exec` and `GET /healthz` using [`reqwest`].
//! Every call carries its own timeout so a caller's deadline budget includes
//! the broker's overhead.

use std::time::Duration;

use sandbox_core::execution::{ExecutionRequest, ExecutionResult, ProcessRequest};
use serde::Deserialize;

/// HTTP client for a single broker instance.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    client: reqwest::Client,
    base_url: String,
}

/// Liveness payload returned by `GET /healthz`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerHealth {
    pub ok: bool,
    pub image: String,
    pub runtime: String,
}

/// Errors from the broker REST layer.
#[derive(Debug, thiserror::Error)]
pub enum BrokerClientError {
    /// The HTTP request itself failed (connect, timeout, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The broker returned a non-2xx status code.
    #[error("broker returned {status}: {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl BrokerClient {
    /// Create a client for the broker at `base_url`, e.g. `http://sandbox:8088`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL of the broker, as named in transport errors.
    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// Run interpreter code in a fresh sandbox.
    pub async fn run(
        &self,
        request: &ExecutionRequest,
        timeout: Duration,
    ) -> Result<ExecutionResult, BrokerClientError> {
        let response = self
            .client
            .post(format!("{}/run", self.base_url))
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Run an explicit argv in a fresh sandbox.
    pub async fn exec(
        &self,
        request: &ProcessRequest,
        timeout: Duration,
    ) -> Result<ExecutionResult, BrokerClientError> {
        let response = self
            .client
            .post(format!("{}/exec", self.base_url))
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Query the broker's liveness probe.
    pub async fn health(&self, timeout: Duration) -> Result<BrokerHealth, BrokerClientError> {
        let response = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .timeout(timeout)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or capture status
    /// and body text as a [`BrokerClientError::ApiError`].
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BrokerClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BrokerClientError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BrokerClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = BrokerClient::new("http://sandbox:8088/");
        assert_eq!(client.endpoint(), "http://sandbox:8088");
    }

    #[test]
    fn api_error_display_includes_status_and_body() {
        let err = BrokerClientError::ApiError {
            status: 500,
            body: r#"{"error":"Container runtime 'docker' not found"}"#.to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("broker returned 500"));
        assert!(text.contains("not found"));
    }
}
