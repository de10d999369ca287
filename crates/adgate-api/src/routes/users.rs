//! `/users` endpoints

use adgate_core::types::{MoveRequest, NewUser, PasswordBody, UserUpdate};
use axum::extract::{Path, RawQuery, State};

use super::query_options;
use crate::body::{decode, BodySchema, Input};
use crate::respond::{Failure, Reply};
use crate::server::AppState;

type ApiResult = Result<Reply, Failure>;

pub async fn list_users(State(state): State<AppState>, query: RawQuery) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.list_users(&query).await)
}

pub async fn add_user(State(state): State<AppState>, Input(body): Input) -> ApiResult {
    let user: NewUser = decode(body, &BodySchema::USER)?;
    Ok(Reply::from_result(state.directory.add_user(user).await))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
    query: RawQuery,
) -> Reply {
    let query = query_options(query);
    Reply::from_result(state.directory.get_user(&user, &query).await)
}

pub async fn user_exists(State(state): State<AppState>, Path(user): Path<String>) -> Reply {
    Reply::from_result(state.directory.user_exists(&user).await)
}

pub async fn is_member_of(
    State(state): State<AppState>,
    Path((user, group)): Path<(String, String)>,
) -> Reply {
    Reply::from_result(state.directory.is_member_of(&user, &group).await)
}

pub async fn authenticate(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Input(body): Input,
) -> ApiResult {
    let credentials: PasswordBody = decode(body, &BodySchema::USER)?;
    let password = credentials.into_password().unwrap_or_default();
    Ok(Reply::from_result(
        state.directory.authenticate(&user, &password).await,
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Input(body): Input,
) -> ApiResult {
    let update: UserUpdate = decode(body, &BodySchema::USER).map_err(Failure::unsuccessful)?;
    Ok(Reply::success_or_failed(
        state.directory.update_user(&user, update).await,
    ))
}

pub async fn set_password(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Input(body): Input,
) -> ApiResult {
    let credentials: PasswordBody = decode(body, &BodySchema::USER).map_err(Failure::unsuccessful)?;
    let password = credentials.into_password().unwrap_or_default();
    Ok(Reply::success_or_failed(
        state.directory.set_password(&user, &password).await,
    ))
}

pub async fn set_password_never_expires(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Reply {
    Reply::success_or_failed(state.directory.set_password_never_expires(&user).await)
}

pub async fn set_password_expires(State(state): State<AppState>, Path(user): Path<String>) -> Reply {
    Reply::success(state.directory.set_password_expires(&user).await)
}

pub async fn enable_user(State(state): State<AppState>, Path(user): Path<String>) -> Reply {
    Reply::success(state.directory.enable_user(&user).await)
}

pub async fn disable_user(State(state): State<AppState>, Path(user): Path<String>) -> Reply {
    Reply::success(state.directory.disable_user(&user).await)
}

pub async fn move_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Input(body): Input,
) -> ApiResult {
    let request: MoveRequest = decode(body, &BodySchema::USER)?;
    Ok(Reply::success(
        state.directory.move_user(&user, &request.location).await,
    ))
}

pub async fn unlock_user(State(state): State<AppState>, Path(user): Path<String>) -> Reply {
    Reply::success(state.directory.unlock_user(&user).await)
}

pub async fn remove_user(State(state): State<AppState>, Path(user): Path<String>) -> Reply {
    Reply::success(state.directory.remove_user(&user).await)
}
