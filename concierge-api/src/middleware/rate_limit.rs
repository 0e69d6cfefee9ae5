use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Fixed window per client IP. Cache failures let the request through.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    let key = format!("ratelimit:{}", ip);
    let limit = &state.rate_limit;

    match state.trip.cache.check_rate_limit(&key, limit.requests_per_window, limit.window_seconds).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            warn!(%ip, "Rate limit exceeded");
            AppError::RateLimitError.into_response()
        }
        Err(e) => {
            warn!("Rate limit check failed, allowing request: {}", e);
            next.run(req).await
        }
    }
}

/// Peer address, or the first `X-Forwarded-For` hop behind a proxy.
fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return forwarded.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
