//! Shared blocking HTTP plumbing for model-server backends.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use tracing::debug;

use super::types::{BackendError, HealthResponse};

/// A configured HTTP client bound to one server base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Get the base URL for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Probe `GET {base}/health`.
    ///
    /// Used during prepare, so every failure maps to `Unavailable`.
    pub fn health(&self) -> Result<HealthResponse, BackendError> {
        let url = self.endpoint("health");
        debug!(%url, "probing backend health");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BackendError::Unavailable(format!("{}: {e}", self.base_url)))?;

        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!(
                "{} answered health check with {}",
                self.base_url,
                response.status()
            )));
        }

        response
            .json()
            .map_err(|e| BackendError::Unavailable(format!("malformed health response: {e}")))
    }
}

/// Turn a non-2xx response into an error, keeping a short body excerpt.
pub fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(status_error(status, &body))
}

/// Client errors (4xx) mean the server refused this input: `Rejected`.
/// Anything else is `RequestFailed`.
pub fn status_error(status: StatusCode, body: &str) -> BackendError {
    let excerpt: String = body.trim().chars().take(200).collect();
    let message = if excerpt.is_empty() {
        format!("Status: {status}")
    } else {
        format!("Status: {status}: {excerpt}")
    };

    if status.is_client_error() {
        BackendError::Rejected(message)
    } else {
        BackendError::RequestFailed(message)
    }
}

/// Read the full response body.
pub fn read_body(response: Response) -> Result<Vec<u8>, BackendError> {
    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| BackendError::InvalidResponse(e.to_string()))
}
