//! Boundary tests: the limiter mounted as axum middleware.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tollgate::{rate_limit, RateLimitState, RateLimiter};
use tower::ServiceExt;

fn test_router(rate: u32, burst: u32, trust_proxy: bool) -> Router {
    let state = RateLimitState {
        limiter: Arc::new(RateLimiter::new(rate, burst)),
        trust_proxy,
    };
    Router::new()
        .route("/api/status", get(|| async { "handler ran" }))
        .route_layer(from_fn_with_state(state, rate_limit))
}

fn request(headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/status");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_under_the_limit_reach_the_handler_unchanged() {
    let app = test_router(100, 5, true);

    let response = app
        .oneshot(request(&[("x-forwarded-for", "1.2.3.4")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"handler ran");
}

#[tokio::test]
async fn deny_response_matches_the_contract() {
    let app = test_router(100, 1, true);

    let first = app
        .clone()
        .oneshot(request(&[("x-forwarded-for", "1.2.3.4")]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(request(&[("x-forwarded-for", "1.2.3.4")]))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(
        body_json(second).await,
        json!({
            "status": false,
            "data": [],
            "message": "Rate limit exceeded. Please try again later."
        })
    );
}

#[tokio::test]
async fn distinct_forwarded_for_values_have_independent_budgets() {
    let app = test_router(100, 1, true);

    let allowed = app
        .clone()
        .oneshot(request(&[("x-forwarded-for", "1.2.3.4")]))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    let denied = app
        .clone()
        .oneshot(request(&[("x-forwarded-for", "1.2.3.4")]))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_client = app
        .oneshot(request(&[("x-forwarded-for", "5.6.7.8")]))
        .await
        .unwrap();
    assert_eq!(other_client.status(), StatusCode::OK);
}

#[tokio::test]
async fn forwarded_for_outranks_real_ip() {
    let app = test_router(100, 1, true);

    let first = app
        .clone()
        .oneshot(request(&[
            ("x-forwarded-for", "1.2.3.4"),
            ("x-real-ip", "9.9.9.9"),
        ]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Same x-real-ip, different x-forwarded-for: a fresh budget, so keying
    // must have used the forwarded-for value.
    let second = app
        .oneshot(request(&[
            ("x-forwarded-for", "5.6.7.8"),
            ("x-real-ip", "9.9.9.9"),
        ]))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
}

#[tokio::test]
async fn real_ip_is_used_when_forwarded_for_is_absent() {
    let app = test_router(100, 1, true);

    let first = app
        .clone()
        .oneshot(request(&[("x-real-ip", "9.9.9.9")]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(request(&[("x-real-ip", "9.9.9.9")]))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn requests_without_any_identity_share_one_budget() {
    let app = test_router(100, 1, true);

    let first = app.clone().oneshot(request(&[])).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(request(&[])).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn untrusted_proxy_ignores_identity_headers() {
    let app = test_router(100, 1, false);

    let first = app
        .clone()
        .oneshot(request(&[("x-forwarded-for", "1.2.3.4")]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // A different header value lands on the same fallback key.
    let second = app
        .oneshot(request(&[("x-forwarded-for", "5.6.7.8")]))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn transport_address_keys_include_the_port() {
    let app = test_router(100, 1, true);
    let from_port = |port: u16| {
        let addr: SocketAddr = format!("10.0.0.1:{port}").parse().unwrap();
        Request::builder()
            .uri("/api/status")
            .extension(addr)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(from_port(4000)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let same_port = app.clone().oneshot(from_port(4000)).await.unwrap();
    assert_eq!(same_port.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_port = app.oneshot(from_port(4001)).await.unwrap();
    assert_eq!(other_port.status(), StatusCode::OK);
}

#[tokio::test]
async fn concurrent_requests_admit_exactly_burst() {
    let app = test_router(100, 5, true);

    let mut handles = Vec::new();
    for _ in 0..40 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.oneshot(request(&[("x-forwarded-for", "1.2.3.4")]))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() == StatusCode::OK {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);
}
