//! HTTP middleware and session extraction.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use laurel_core::{Capability, Session};

use super::state::AppState;
use super::json_error;

/// Rate limiting middleware. Checks per-IP request rate before routing.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match state.rate_limiter.check(addr.ip()).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let body = serde_json::json!({
                "error": {
                    "code": "rate_limited",
                    "message": "rate limit exceeded",
                    "retry_after": retry_after,
                }
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}

/// Build the caller's [`Session`] from the trusted identity headers.
///
/// `x-actor-id` is required; without it the request is 401. Unknown
/// capability tokens in `x-capabilities` are rejected outright rather than
/// ignored, so a misconfigured gateway fails loudly instead of silently
/// downgrading a reviewer.
pub(crate) fn require_session(headers: &HeaderMap) -> Result<Session, Response> {
    let actor_id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "missing x-actor-id header",
            )
        })?;

    let mut capabilities = Vec::new();
    if let Some(raw) = headers.get("x-capabilities").and_then(|v| v.to_str().ok()) {
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match Capability::parse(token) {
                Some(cap) => capabilities.push(cap),
                None => {
                    return Err(json_error(
                        StatusCode::BAD_REQUEST,
                        "invalid_input",
                        &format!("unknown capability '{}'", token),
                    ))
                }
            }
        }
    }

    Ok(Session::new(actor_id, &capabilities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn session_requires_actor_id() {
        assert!(require_session(&headers(&[])).is_err());
        assert!(require_session(&headers(&[("x-actor-id", "  ")])).is_err());
    }

    #[test]
    fn session_parses_capability_list() {
        let session =
            require_session(&headers(&[("x-actor-id", "t-1"), ("x-capabilities", "reviewer")]))
                .unwrap();
        assert_eq!(session.actor_id, "t-1");
        assert!(session.has(Capability::Reviewer));
        assert!(!session.has(Capability::Admin));

        let session = require_session(&headers(&[
            ("x-actor-id", "a-1"),
            ("x-capabilities", "reviewer, admin"),
        ]))
        .unwrap();
        assert!(session.has(Capability::Reviewer));
        assert!(session.has(Capability::Admin));
    }

    #[test]
    fn unknown_capability_is_rejected() {
        assert!(require_session(&headers(&[
            ("x-actor-id", "t-1"),
            ("x-capabilities", "superuser"),
        ]))
        .is_err());
    }

    #[test]
    fn empty_capability_header_is_fine() {
        let session =
            require_session(&headers(&[("x-actor-id", "s-1"), ("x-capabilities", "")])).unwrap();
        assert!(session.capabilities.is_empty());
    }
}
