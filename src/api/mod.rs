//! HTTP surface over the conversation orchestrator.

pub mod routes;

pub use routes::{AppState, api_routes};
