//! Upstream API error classification
//!
//! Parses HTTP error responses from the odds and stats APIs into structured
//! types so failures are logged with something more useful than a status.

use serde::Deserialize;
use thiserror::Error;

/// Structured upstream API error types
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// API key missing, invalid or revoked
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Request quota used up or too many requests
    #[error("rate limited or quota exhausted: {0}")]
    RateLimited(String),
    /// Unknown event or resource
    #[error("not found: {0}")]
    NotFound(String),
    /// Bad parameters (unknown market, bad region, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Network/connection error (timeout, DNS, etc.)
    #[error("network error: {0}")]
    Network(String),
    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// Unknown error with status code and body
    #[error("API error {status}: {body}")]
    Unknown { status: u16, body: String },
}

/// Error body format of the odds API
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

impl UpstreamError {
    /// Parse a non-success response into a structured error
    pub fn from_response(status: u16, body: &str) -> Self {
        let (message, code) = match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(parsed) => (
                parsed.message.unwrap_or_else(|| body.to_string()),
                parsed.error_code.unwrap_or_default(),
            ),
            Err(_) => (body.to_string(), String::new()),
        };

        let code_upper = code.to_uppercase();
        let msg_lower = message.to_lowercase();

        if status == 429
            || code_upper.contains("QUOTA")
            || code_upper.contains("RATE_LIMIT")
            || msg_lower.contains("quota")
            || msg_lower.contains("too many requests")
        {
            return UpstreamError::RateLimited(message);
        }

        if status == 401 || status == 403 || code_upper.contains("INVALID_KEY") || code_upper.contains("MISSING_KEY") {
            return UpstreamError::Unauthorized(message);
        }

        if status == 404 || code_upper.contains("NOT_FOUND") {
            return UpstreamError::NotFound(message);
        }

        if status == 400 || status == 422 || code_upper.starts_with("INVALID_") {
            return UpstreamError::InvalidRequest(message);
        }

        UpstreamError::Unknown {
            status,
            body: message,
        }
    }

    /// Classify a transport-level reqwest error
    pub fn from_network_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Network("request timed out".to_string())
        } else if err.is_connect() {
            UpstreamError::Network("connection failed".to_string())
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}
