//! Per-client request admission control for axum services.
//!
//! A minute-granularity token bucket limiter keyed by client identity,
//! exposed as axum middleware. State is process-local; multi-instance
//! deployments see independent per-instance budgets.

pub mod config;
pub mod limiter;
pub mod middleware;
pub mod response;
pub mod sweep;

pub use config::Config;
pub use limiter::RateLimiter;
pub use middleware::{rate_limit, RateLimitState};
pub use response::ApiResponse;
pub use sweep::Sweeper;
