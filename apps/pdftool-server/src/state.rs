//! Application state and per-request caller identity

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::convert::ConversionClient;
use crate::history::HistoryLog;

/// Header naming the caller for the activity log
pub const USER_HEADER: &str = "x-user";

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Processing timeout in milliseconds
    pub timeout_ms: u64,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
    /// Name logged when a request carries no `X-User` header
    pub default_user: Arc<str>,
    pub history: HistoryLog,
    /// `None` when no API key is configured
    pub converter: Option<ConversionClient>,
}

/// The user a request is attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let named = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Ok(Caller(named.unwrap_or_else(|| {
            AppState::from_ref(state).default_user.to_string()
        })))
    }
}
