//! Shared HTTP client for the remote APIs.
//!
//! Handles bearer authentication, response classification, and the retry
//! loop. Integration adapters only deal in paths and JSON bodies.

use reqwest::{header, Client, Method, StatusCode};
use std::time::Duration;
use tracing::trace;

use crate::error::GatewayError;

use super::retry::Retrier;

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// `application/x-www-form-urlencoded` pairs; keys may repeat.
    Form(Vec<(String, String)>),
    /// JSON document.
    Json(serde_json::Value),
}

/// Authenticated JSON API client with built-in retry.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client.
    client: Client,
    /// Base URL without trailing slash.
    base_url: String,
    /// Bearer token.
    token: String,
    /// Retry policy runner.
    retrier: Retrier,
}

impl ApiClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: Duration,
        retrier: Retrier,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retrier,
        })
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn get(&self, path: &str) -> Result<serde_json::Value, GatewayError> {
        self.send(Method::GET, path, &RequestBody::Empty).await
    }

    /// Sends a request under the retry policy and returns the decoded body.
    ///
    /// An empty response body decodes to `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: &RequestBody,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let operation = format!("{method} {path}");

        self.retrier
            .run(&operation, || self.send_once(method.clone(), &url, body))
            .await
    }

    /// Sends a single request.
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: &RequestBody,
    ) -> Result<serde_json::Value, GatewayError> {
        trace!("{method} {url}");

        let request = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json");

        let request = match body {
            RequestBody::Empty => request,
            RequestBody::Form(pairs) => request.form(pairs),
            RequestBody::Json(value) => request.json(value),
        };

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::AuthenticationFailed { message: body });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::api_error(status.as_u16(), body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::invalid_response(format!("Failed to read body: {e}")))?;

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| GatewayError::invalid_response(format!("Failed to parse response: {e}")))
    }
}

/// Maps a transport failure onto the retryable error kinds.
fn classify_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            message: err.to_string(),
        }
    } else {
        GatewayError::network(err.to_string())
    }
}
