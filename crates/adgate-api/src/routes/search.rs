//! Cross-type listings and raw filter search

use axum::extract::{Path, RawQuery, State};

use super::query_options;
use crate::respond::Reply;
use crate::server::AppState;

/// `GET /other`: objects that are neither users, groups nor OUs
pub async fn list_other(State(state): State<AppState>, query: RawQuery) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.list_other(&query).await)
}

/// `GET /all`
pub async fn list_all(State(state): State<AppState>, query: RawQuery) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.list_all(&query).await)
}

/// `GET /find/{filter}`
pub async fn find(
    State(state): State<AppState>,
    Path(filter): Path<String>,
    query: RawQuery,
) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.find(&filter, &query).await)
}
