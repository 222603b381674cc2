//! Admission middleware: derive a client key, ask the store, 429 on deny.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{limiter::RateLimiter, response::ApiResponse};

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Shared state for [`rate_limit`]: the bucket store plus the policy flag
/// controlling whether client-supplied identity headers are honored.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub trust_proxy: bool,
}

/// Rate limiting middleware for `axum::middleware::from_fn_with_state`.
///
/// On deny, short-circuits with a 429 and the fixed envelope body; on allow,
/// the wrapped handler receives the request unmodified. No quota headers are
/// emitted.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<SocketAddr>()
        .copied()
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|value| value.0)
        });
    let key = client_key(request.headers(), socket_addr, state.trust_proxy);

    if !state.limiter.allow(&key) {
        tracing::warn!(key = %key, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            ApiResponse::error(RATE_LIMIT_MESSAGE),
        )
            .into_response();
    }

    next.run(request).await
}

/// Header values are used verbatim; distinct spellings of the same client are
/// distinct keys. The transport fallback keeps the port so it matches the
/// peer address as the listener saw it.
fn client_key(headers: &HeaderMap, socket_addr: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        for header in ["x-forwarded-for", "x-real-ip"] {
            if let Some(value) = headers.get(header).and_then(|value| value.to_str().ok()) {
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
    }

    socket_addr
        .map(|address| address.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
