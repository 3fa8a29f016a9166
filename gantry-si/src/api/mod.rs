//! HTTP API for the schedule import service

mod health;
mod import;

pub use health::health_routes;
pub use import::import_routes;
