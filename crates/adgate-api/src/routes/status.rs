//! Liveness endpoint

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::server::AppState;

/// `GET /status`, reachable without a signature
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let uptime = state.start_time.elapsed().as_millis() as u64;
    Json(json!({ "online": true, "uptime": uptime }))
}
