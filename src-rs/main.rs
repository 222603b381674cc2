use std::{collections::HashSet, env, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{
    http::{Method, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tokio::signal;
use tollgate::{rate_limit, ApiResponse, Config, RateLimitState, RateLimiter, Sweeper};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded_env_files = load_env_files()?;
    init_tracing();
    if loaded_env_files.is_empty() {
        tracing::warn!("No .env or .env.local file found. Using process environment only.");
    } else {
        let files = loaded_env_files
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(files = %files, "Loaded environment files");
    }

    let config = Config::from_env();

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_requests,
        config.rate_limit_burst,
    ));
    let sweeper = Sweeper::spawn(
        Arc::clone(&limiter),
        config.sweep_interval,
        config.idle_cutoff,
    );
    let state = RateLimitState {
        limiter,
        trust_proxy: config.trust_proxy,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        port = config.port,
        rate = config.rate_limit_requests,
        burst = config.rate_limit_burst,
        trust_proxy = config.trust_proxy,
        "Running in HTTP mode."
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    sweeper.shutdown().await;
    tracing::info!("Shutdown complete.");

    Ok(())
}

fn build_router(state: RateLimitState) -> Router {
    let api_router = Router::new()
        .route("/status", get(api_status))
        .route_layer(axum_middleware::from_fn_with_state(state, rate_limit));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .nest("/health", Router::new().route("/", get(health)))
        .nest("/api", api_router)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Response {
    (StatusCode::OK, "Service is online.").into_response()
}

async fn api_status() -> Response {
    ApiResponse::success(
        json!({ "service": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") }),
        "",
    )
    .into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, ApiResponse::error("Not Found")).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_env_files() -> anyhow::Result<Vec<PathBuf>> {
    let mut roots = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(executable_path) = env::current_exe() {
        if let Some(executable_dir) = executable_path.parent() {
            roots.push(executable_dir.to_path_buf());
        }
    }
    roots.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")));

    let mut seen_roots = HashSet::new();
    let mut loaded = Vec::new();

    for root in roots {
        let key = root.to_string_lossy().to_string();
        if !seen_roots.insert(key) {
            continue;
        }

        for filename in [".env", ".env.local"] {
            let path = root.join(filename);
            if path.is_file() {
                dotenvy::from_path(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                loaded.push(path);
            }
        }
    }

    if loaded.is_empty() {
        if let Ok(path) = dotenvy::dotenv() {
            loaded.push(path);
        }
    }

    Ok(loaded)
}
