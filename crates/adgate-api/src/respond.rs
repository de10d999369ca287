//! Response normalization
//!
//! Every handler produces an [`OperationResult`]; [`normalize`] turns it into
//! the status code and JSON body sent to the client.

use adgate_core::{DirectoryError, DirectoryResult};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::metrics::names;

/// Failure branch of an operation result
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// HTTP status hint; consumed by [`normalize`], never serialized
    pub status: Option<u16>,
    pub body: Map<String, Value>,
}

impl Failure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(message.into()));
        Self { status, body }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Some(400), message)
    }

    /// Lead the body with `"success": false`
    pub fn unsuccessful(self) -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.extend(self.body);
        Self {
            status: self.status,
            body,
        }
    }
}

impl From<DirectoryError> for Failure {
    fn from(e: DirectoryError) -> Self {
        Failure::new(e.status_hint(), e.to_string())
    }
}

/// Outcome of one directory call: a payload (possibly absent) or a failure
pub type OperationResult = Result<Option<Value>, Failure>;

/// Map an operation result to the response status and body
pub fn normalize(result: OperationResult) -> (StatusCode, Value) {
    match result {
        Err(failure) => {
            let status = failure
                .status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);

            let mut body = failure.body;
            body.insert("error".to_string(), Value::Bool(true));
            (status, Value::Object(body))
        }
        Ok(Some(Value::Bool(b))) => (StatusCode::OK, json!({ "data": b })),
        Ok(Some(data)) => (StatusCode::OK, data),
        Ok(None) => (StatusCode::OK, json!({})),
    }
}

/// Handler return type carrying an [`OperationResult`]
#[derive(Debug)]
pub struct Reply(pub OperationResult);

impl Reply {
    /// Serialize a directory payload
    pub fn from_result<T: Serialize>(result: DirectoryResult<T>) -> Self {
        Reply(result.map_err(Failure::from).and_then(|data| {
            serde_json::to_value(data)
                .map(Some)
                .map_err(|e| Failure::new(Some(500), e.to_string()))
        }))
    }

    /// `{ "success": true }` on completion
    pub fn success(result: DirectoryResult<()>) -> Self {
        Reply(
            result
                .map(|_| Some(json!({ "success": true })))
                .map_err(Failure::from),
        )
    }

    /// Like [`Reply::success`], with `"success": false` added to failures
    pub fn success_or_failed(result: DirectoryResult<()>) -> Self {
        Reply(
            result
                .map(|_| Some(json!({ "success": true })))
                .map_err(|e| Failure::from(e).unsuccessful()),
        )
    }

    pub fn failure(failure: Failure) -> Self {
        Reply(Err(failure))
    }
}

impl From<Failure> for Reply {
    fn from(failure: Failure) -> Self {
        Reply::failure(failure)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let failed = self.0.is_err();
        let (status, body) = normalize(self.0);

        if failed {
            warn!(
                status = status.as_u16(),
                message = body.get("message").and_then(|v| v.as_str()).unwrap_or(""),
                "Directory operation failed"
            );
            ::metrics::counter!(
                names::DIRECTORY_FAILURES_TOTAL,
                "status" => status.as_u16().to_string()
            )
            .increment(1);
        }

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        Reply::failure(self).into_response()
    }
}
