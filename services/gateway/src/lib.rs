//! HTTP gateway for the matching engine
//!
//! Thin axum service over [`matching_engine::MatchingEngine`]: request
//! validation, API-key auth and rate limiting on write paths, and JSON
//! views of engine results. The engine itself is constructed in `main`
//! and injected through [`state::AppState`].

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;
