//! Per-import diagnostic trail
//!
//! One trail is created per import request and threaded through the
//! pipeline as an explicit parameter, so concurrent imports never share
//! logging state. The trail is returned to the caller whether the import
//! succeeds or fails.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Severity of one import log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Info,
    Success,
    Warning,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Info => "info",
            LogType::Success => "success",
            LogType::Warning => "warning",
        }
    }
}

/// One user-facing import log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLog {
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub message: String,
}

/// Accumulated diagnostics for one import
///
/// `logs` are the user-facing progress lines; `diagnostics` are the
/// timestamped engineering trail used for post-hoc debugging.
#[derive(Debug, Default)]
pub struct DiagnosticTrail {
    logs: Vec<ImportLog>,
    diagnostics: Vec<String>,
}

impl DiagnosticTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped engineering diagnostic line
    pub fn push(&mut self, message: impl Into<String>) {
        let line = format!("{} {}", Utc::now().to_rfc3339(), message.into());
        self.diagnostics.push(line);
    }

    /// Record a user-facing log line; also lands in the diagnostic trail
    pub fn log(&mut self, log_type: LogType, message: impl Into<String>) {
        let message = message.into();
        self.push(format!("[{}] {}", log_type.as_str(), &message));
        self.logs.push(ImportLog { log_type, message });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogType::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.log(LogType::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogType::Warning, message);
    }

    pub fn logs(&self) -> &[ImportLog] {
        &self.logs
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Consume the trail for the response body
    pub fn into_parts(self) -> (Vec<ImportLog>, Vec<String>) {
        (self.logs, self.diagnostics)
    }
}
