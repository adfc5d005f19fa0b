//! Static API key check for write endpoints
//!
//! When an API key is configured, every mutating request must carry it
//! in the `X-API-Key` header. An unset key disables the check entirely.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

const API_KEY_HEADER: &str = "X-API-Key";

/// Extractor placed on write handlers; succeeds silently when auth is
/// disabled.
pub struct WriteAuth;

#[async_trait]
impl FromRequestParts<AppState> for WriteAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_key.as_deref() else {
            return Ok(WriteAuth);
        };

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided == Some(expected) {
            Ok(WriteAuth)
        } else {
            Err(ApiError::Unauthorized(
                "missing or invalid API key".to_string(),
            ))
        }
    }
}
