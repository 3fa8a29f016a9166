//! Data models for the schedule import service

pub mod import_session;
pub mod plan;

pub use import_session::{ImportSession, ImportState, StateTransition};
pub use plan::{ConvertedPlan, ImportContext, ImportSummary, Row};
