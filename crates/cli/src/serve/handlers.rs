//! HTTP route handlers for the achievement review API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use laurel_core::{
    AchievementRecord, DecisionEvent, LifecycleError, Page, RecordFilter, ReviewAction, Status,
};
use laurel_engine::{EngineError, NewAchievement};

use super::middleware::require_session;
use super::state::AppState;
use super::json_error;

/// Default page size for listings; capped at [`MAX_PAGE_SIZE`].
const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

// ── Request/response shapes ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateBody {
    title: String,
    category: String,
    #[serde(default)]
    content_refs: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct VersionBody {
    version: i64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ApproveBody {
    version: i64,
    score: i64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RejectBody {
    version: i64,
    reason: String,
}

#[derive(Deserialize)]
pub(crate) struct ListParams {
    status: Option<String>,
    owner_id: Option<String>,
    category: Option<String>,
    /// Case-insensitive substring match on the title.
    title: Option<String>,
    page: Option<usize>,
    page_size: Option<usize>,
}

fn record_body(status: StatusCode, record: &AchievementRecord) -> Response {
    (status, Json(serde_json::json!({ "record": record }))).into_response()
}

fn page_body(page: &Page<AchievementRecord>) -> Response {
    Json(serde_json::json!({
        "records": page.items,
        "page": page.page,
        "page_size": page.page_size,
        "total": page.total,
    }))
    .into_response()
}

fn events_body(events: &[DecisionEvent]) -> Response {
    Json(serde_json::json!({ "events": events })).into_response()
}

/// Map a body-extraction failure (malformed JSON, wrong shape, unknown
/// fields) onto the strict error schema instead of axum's plain-text
/// rejection.
fn invalid_body(rejection: JsonRejection) -> Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_input",
        &rejection.body_text(),
    )
}

/// Map an engine error onto the wire taxonomy.
fn error_response(err: EngineError) -> Response {
    match err {
        EngineError::Lifecycle(e) => {
            let (status, code) = match e {
                LifecycleError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "invalid_input"),
                LifecycleError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
                LifecycleError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                LifecycleError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "invalid_transition")
                }
                LifecycleError::ConcurrentModification { .. } => {
                    (StatusCode::CONFLICT, "concurrent_modification")
                }
            };
            json_error(status, code, &e.to_string())
        }
        EngineError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage",
                "internal storage error",
            )
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "no such endpoint")
}

/// GET /health
pub(crate) async fn handle_health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// POST /achievements
pub(crate) async fn handle_create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Response {
    let session = match require_session(&headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection),
    };
    let input = NewAchievement {
        title: body.title,
        category: body.category,
        content_refs: body.content_refs,
    };
    match state.engine.create(&session, input).await {
        Ok(record) => record_body(StatusCode::CREATED, &record),
        Err(e) => error_response(e),
    }
}

/// GET /achievements
pub(crate) async fn handle_list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    let session = match require_session(&headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => match Status::parse(raw) {
            Some(s) => Some(s),
            None => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_input",
                    &format!("unknown status '{}'", raw),
                )
            }
        },
    };

    let filter = RecordFilter {
        status,
        owner_id: params.owner_id,
        category: params.category,
        title_contains: params.title,
    };
    let page = params.page.unwrap_or(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    match state.engine.list(&session, &filter, page, page_size).await {
        Ok(page) => page_body(&page),
        Err(e) => error_response(e),
    }
}

/// GET /achievements/{id}
pub(crate) async fn handle_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let session = match require_session(&headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.engine.get(&session, &id).await {
        Ok(record) => record_body(StatusCode::OK, &record),
        Err(e) => error_response(e),
    }
}

/// GET /achievements/{id}/events
pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let session = match require_session(&headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.engine.history(&session, &id).await {
        Ok(events) => events_body(&events),
        Err(e) => error_response(e),
    }
}

/// DELETE /achievements/{id}
pub(crate) async fn handle_delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let session = match require_session(&headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.engine.delete(&session, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /achievements/{id}/submit
pub(crate) async fn handle_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<VersionBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection),
    };
    transition(&state, &headers, &id, body.version, ReviewAction::Submit).await
}

/// POST /achievements/{id}/approve
pub(crate) async fn handle_approve(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<ApproveBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection),
    };
    transition(
        &state,
        &headers,
        &id,
        body.version,
        ReviewAction::Approve { score: body.score },
    )
    .await
}

/// POST /achievements/{id}/reject
pub(crate) async fn handle_reject(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<RejectBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection),
    };
    transition(
        &state,
        &headers,
        &id,
        body.version,
        ReviewAction::Reject {
            reason: body.reason,
        },
    )
    .await
}

/// POST /achievements/{id}/withdraw
pub(crate) async fn handle_withdraw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<VersionBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection),
    };
    transition(&state, &headers, &id, body.version, ReviewAction::Withdraw).await
}

/// POST /achievements/{id}/resubmit
pub(crate) async fn handle_resubmit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<VersionBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return invalid_body(rejection),
    };
    transition(&state, &headers, &id, body.version, ReviewAction::Resubmit).await
}

async fn transition(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    version: i64,
    action: ReviewAction,
) -> Response {
    let session = match require_session(headers) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match state.engine.transition(&session, id, version, action).await {
        Ok(record) => record_body(StatusCode::OK, &record),
        Err(e) => error_response(e),
    }
}
