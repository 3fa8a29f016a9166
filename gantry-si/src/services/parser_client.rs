//! External schedule-parsing service client
//!
//! The parsing service is a black box: document bytes go in as a
//! multipart upload, a structured plan payload comes back as JSON. One
//! call per import, a hard timeout that aborts the in-flight request,
//! and no retries: a failed parse aborts the whole import.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Longest acceptable parse call; large schedules take a while upstream
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(120);

/// How much upstream response text to keep as a diagnostic
const DIAGNOSTIC_SAMPLE_LEN: usize = 512;

/// Parser client errors
#[derive(Debug, Error)]
pub enum ParserError {
    /// Transport failure, including the hard timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered outside 2xx; body kept for diagnosis
    #[error("Parsing service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Body was not the expected success-flagged JSON object
    #[error("Malformed parser payload: {0}")]
    Malformed(String),
}

/// Client for the external schedule parsing service
pub struct ParserClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ParserClient {
    /// Build a client with a hard per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ParserError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParserError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Submit document bytes for parsing
    ///
    /// Succeeds only on a 2xx response whose JSON body carries
    /// `success: true`; anything else is a [`ParserError`] with the raw
    /// response text as diagnostic.
    pub async fn parse(&self, file_name: &str, bytes: Vec<u8>) -> Result<Value, ParserError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(endpoint = %self.endpoint, file_name, "Submitting document to parsing service");

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ParserError::Network(format!("parse call timed out: {}", e))
                } else {
                    ParserError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ParserError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ParserError::Upstream {
                status: status.as_u16(),
                body: sample(&body),
            });
        }

        validate_payload(&body)
    }
}

/// Validate the parser response body shape
///
/// The contract is a JSON object with an explicit boolean success flag;
/// any other shape fails with the offending text as diagnostic.
pub fn validate_payload(body: &str) -> Result<Value, ParserError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|_| ParserError::Malformed(sample(body)))?;

    match payload.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(payload),
        _ => Err(ParserError::Malformed(sample(body))),
    }
}

/// Truncate upstream text to a diagnostic-sized sample
fn sample(text: &str) -> String {
    if text.len() <= DIAGNOSTIC_SAMPLE_LEN {
        return text.to_string();
    }
    let mut end = DIAGNOSTIC_SAMPLE_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
