//! Honeypot: conversational scam engagement and intelligence extraction.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod session;
