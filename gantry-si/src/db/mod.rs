//! Database access for the schedule import service

pub mod documents;
pub mod hours;
pub mod project_logs;
pub mod replace;
pub mod upsert;
