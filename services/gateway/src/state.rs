use crate::rate_limit::RateLimiter;
use matching_engine::MatchingEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchingEngine>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Static write-path API key; `None` disables auth.
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(engine: Arc<MatchingEngine>, api_key: Option<String>) -> Self {
        Self {
            engine,
            rate_limiter: Arc::new(RateLimiter::new()),
            api_key,
        }
    }
}
