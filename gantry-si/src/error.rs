//! Error taxonomy for the schedule import pipeline
//!
//! Each variant maps to one HTTP status category. Validation failures
//! are reported before any store access; transaction failures always
//! follow a full rollback.

use axum::http::StatusCode;
use thiserror::Error;

use crate::services::parser_client::ParserError;
use crate::services::plan_converter::ConversionError;

/// Errors that abort a schedule import
#[derive(Debug, Error)]
pub enum ImportError {
    /// Missing or malformed request field (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document id / storage path resolves to nothing (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream parsing service failed (500)
    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    /// Parser payload could not be normalized (500)
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Replace transaction failed and was rolled back (500)
    #[error("Transaction error: {0}")]
    Transaction(#[source] anyhow::Error),
}

impl ImportError {
    /// HTTP status for the failure response
    pub fn status_code(&self) -> StatusCode {
        match self {
            ImportError::Validation(_) => StatusCode::BAD_REQUEST,
            ImportError::NotFound(_) => StatusCode::NOT_FOUND,
            ImportError::Parser(_)
            | ImportError::Conversion(_)
            | ImportError::Transaction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for import pipeline steps
pub type ImportResult<T> = Result<T, ImportError>;
