pub mod rate_limit;

pub use rate_limit::RateLimiter;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::extract::Request;
use serde_json::json;

use crate::state::AppState;

/// Fixed-window rate limiting keyed by peer IP, applied ahead of every
/// `/api` route. Returns a plain `{error, message}` 429 body rather than
/// going through `ApiError`, since rate limiting is not one of the
/// `FleetError` taxonomy variants.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if state.rate_limiter.check(&addr.ip().to_string()) {
        next.run(request).await
    } else {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "RATE_LIMIT_EXCEEDED", "message": "too many requests" })),
        )
            .into_response()
    }
}
