//! `laurel serve` -- HTTP JSON API for the achievement review lifecycle.
//!
//! Exposes the review engine as an async HTTP service using `axum` +
//! `tokio`. The caller's identity arrives in trusted headers set by the
//! fronting gateway:
//!
//! - `x-actor-id` (required; requests without it get 401)
//! - `x-capabilities` (optional, comma-separated `reviewer`/`admin` tokens)
//!
//! Endpoints:
//! - GET    /health                        - Server status (exempt from session check)
//! - POST   /achievements                  - Create a draft record
//! - GET    /achievements                  - List records (filtered, paginated)
//! - GET    /achievements/{id}             - Fetch a single record
//! - GET    /achievements/{id}/events      - Decision history
//! - POST   /achievements/{id}/submit      - Draft -> Pending
//! - POST   /achievements/{id}/approve     - Pending -> Approved (score)
//! - POST   /achievements/{id}/reject      - Pending -> Rejected (reason)
//! - POST   /achievements/{id}/withdraw    - Pending -> Draft
//! - POST   /achievements/{id}/resubmit    - Rejected -> Pending
//! - DELETE /achievements/{id}             - Tombstone (Draft/Rejected only)
//!
//! All responses use Content-Type: application/json with a strict shape:
//! `{"record": ...}`, `{"records": [...], "page", "page_size", "total"}`,
//! `{"events": [...]}` or `{"error": {"code", "message"}}`.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use laurel_engine::{ReviewEngine, TracingNotifier};
use laurel_storage::MemoryStore;

use self::handlers::{
    handle_approve, handle_create, handle_delete, handle_get, handle_health, handle_history,
    handle_list, handle_not_found, handle_reject, handle_resubmit, handle_submit, handle_withdraw,
};
use self::middleware::rate_limit_middleware;
use self::state::{AppState, RateLimiter};

/// Maximum request body size: 1 MB. Transition payloads are tiny; anything
/// larger is a client error.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct the strict-schema JSON error body.
fn json_error(status: StatusCode, code: &str, message: &str) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({"error": {"code": code, "message": message}})),
    )
        .into_response()
}

/// Start the HTTP server on the given port over the in-memory backend.
///
/// Security:
/// - CORS: Permissive (`Any` origin) for local dev; tighten for production.
/// - Rate limit: Per-IP, `LAUREL_RATE_LIMIT` env var (default 60 req/min).
/// - Identity: trusted headers only; the gateway in front authenticates.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let rate_limit = std::env::var("LAUREL_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT);

    tracing::info!(rate_limit, "per-IP rate limit (requests per minute)");

    let engine = ReviewEngine::new(Arc::new(MemoryStore::new()), Arc::new(TracingNotifier));
    let state = Arc::new(AppState {
        engine,
        rate_limiter: RateLimiter::new(rate_limit),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/achievements", post(handle_create).get(handle_list))
        .route("/achievements/{id}", get(handle_get).delete(handle_delete))
        .route("/achievements/{id}/events", get(handle_history))
        .route("/achievements/{id}/submit", post(handle_submit))
        .route("/achievements/{id}/approve", post(handle_approve))
        .route("/achievements/{id}/reject", post(handle_reject))
        .route("/achievements/{id}/withdraw", post(handle_withdraw))
        .route("/achievements/{id}/resubmit", post(handle_resubmit))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "laurel listening");
    eprintln!("Laurel listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
