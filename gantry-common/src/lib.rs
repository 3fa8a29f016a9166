//! # Gantry Common Library
//!
//! Shared code for the Gantry project-controls services including:
//! - Error types
//! - Configuration and data-folder resolution
//! - Database pool initialization and schema bootstrap
//! - Live table-column introspection

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
