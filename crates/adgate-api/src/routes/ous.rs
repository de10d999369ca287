//! `/ou` endpoints

use adgate_core::types::NewOu;
use axum::extract::{Path, RawQuery, State};

use super::query_options;
use crate::body::{decode, BodySchema, Input};
use crate::respond::{Failure, Reply};
use crate::server::AppState;

pub async fn list_ous(State(state): State<AppState>, query: RawQuery) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.list_ous(&query).await)
}

pub async fn add_ou(State(state): State<AppState>, Input(body): Input) -> Result<Reply, Failure> {
    let ou: NewOu = decode(body, &BodySchema::PLAIN)?;
    Ok(Reply::from_result(state.directory.add_ou(ou).await))
}

pub async fn get_ou(
    State(state): State<AppState>,
    Path(ou): Path<String>,
    query: RawQuery,
) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.get_ou(&ou, &query).await)
}

pub async fn ou_exists(State(state): State<AppState>, Path(ou): Path<String>) -> Reply {
    Reply::from_result(state.directory.ou_exists(&ou).await)
}

pub async fn remove_ou(State(state): State<AppState>, Path(ou): Path<String>) -> Reply {
    Reply::success(state.directory.remove_ou(&ou).await)
}
