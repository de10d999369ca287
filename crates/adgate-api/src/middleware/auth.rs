//! Signed-request authentication middleware

use adgate_auth::{AuthError, SignedRequest};
use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::body::read_body;
use crate::metrics::names;
use crate::respond::Failure;
use crate::server::AppState;

/// Reject any request without a valid, fresh signature
///
/// The body is buffered so it can be hashed, then handed on unchanged.
pub async fn hmac_auth(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.config.server.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %parts.uri.path(), error = %e, "Request body rejected");
            return Failure::new(Some(413), "Request body too large").into_response();
        }
    };

    let content_type = parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let body_value = read_body(content_type, &bytes);

    let verdict = state.auth.verify(&SignedRequest {
        header: parts
            .headers
            .get(state.auth.header_name())
            .and_then(|v| v.to_str().ok()),
        method: parts.method.as_str(),
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/"),
        body: Some(&body_value),
    });

    if let Err(e) = verdict {
        warn!(
            method = %parts.method,
            path = %parts.uri.path(),
            reason = %e,
            "Rejected request signature"
        );
        ::metrics::counter!(names::AUTH_REJECTIONS_TOTAL).increment(1);
        return unauthorized(&e);
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn unauthorized(e: &AuthError) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Invalid request",
            "info": e.to_string(),
        })),
    )
        .into_response()
}
