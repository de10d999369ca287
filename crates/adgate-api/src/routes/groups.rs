//! `/group` endpoints

use adgate_core::types::NewGroup;
use axum::extract::{Path, RawQuery, State};

use super::query_options;
use crate::body::{decode, BodySchema, Input};
use crate::respond::{Failure, Reply};
use crate::server::AppState;

pub async fn list_groups(State(state): State<AppState>, query: RawQuery) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.list_groups(&query).await)
}

pub async fn add_group(State(state): State<AppState>, Input(body): Input) -> Result<Reply, Failure> {
    let group: NewGroup = decode(body, &BodySchema::PLAIN)?;
    Ok(Reply::from_result(state.directory.add_group(group).await))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(group): Path<String>,
    query: RawQuery,
) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.get_group(&group, &query).await)
}

pub async fn group_exists(State(state): State<AppState>, Path(group): Path<String>) -> Reply {
    Reply::from_result(state.directory.group_exists(&group).await)
}

pub async fn add_user_to_group(
    State(state): State<AppState>,
    Path((group, user)): Path<(String, String)>,
) -> Reply {
    Reply::success(state.directory.add_user_to_group(&user, &group).await)
}

pub async fn remove_user_from_group(
    State(state): State<AppState>,
    Path((group, user)): Path<(String, String)>,
) -> Reply {
    Reply::success(state.directory.remove_user_from_group(&user, &group).await)
}

pub async fn remove_group(State(state): State<AppState>, Path(group): Path<String>) -> Reply {
    Reply::success(state.directory.remove_group(&group).await)
}
