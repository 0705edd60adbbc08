use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::payload::{Checked, IdPath, Payload, PinRequest, RenameRequest, path_id};
use crate::{
    AppError, AppResult,
    identity::{Caller, Identity},
    store::{ChatSession, sessions},
};

/// The session, if it exists and belongs to `owner`. Someone else's session looks missing.
pub(crate) async fn owned_session(db_pool: &SqlitePool, id: Uuid, owner: &Identity) -> AppResult<ChatSession> {
    match sessions::find(db_pool, id).await? {
        Some(session) if &session.owner == owner => Ok(session),
        _ => Err(AppError::NotFound("Session")),
    }
}

pub(crate) fn unauthorized_empty() -> Response {
    (StatusCode::UNAUTHORIZED, Json(Vec::<Value>::new())).into_response()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_sessions(
    State(db_pool): State<SqlitePool>,
    Caller(caller): Caller,
) -> AppResult<Response> {
    let Some(owner) = caller else {
        return Ok(unauthorized_empty());
    };

    Ok(Json(sessions::list(&db_pool, &owner).await?).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create_session(
    State(db_pool): State<SqlitePool>,
    caller: Caller,
) -> AppResult<Json<Value>> {
    let owner = caller.require()?;
    let session_id = sessions::create(&db_pool, &owner, sessions::DEFAULT_TITLE).await?;

    Ok(Json(json!({ "session_id": session_id })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_session(
    State(db_pool): State<SqlitePool>,
    caller: Caller,
    id: IdPath,
) -> AppResult<Json<Value>> {
    let owner = caller.require()?;
    let id = path_id(id)?;
    owned_session(&db_pool, id, &owner).await?;
    sessions::delete(&db_pool, id).await?;

    Ok(Json(json!({ "success": true })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn rename_session(
    State(db_pool): State<SqlitePool>,
    caller: Caller,
    id: IdPath,
    payload: Checked<Payload<RenameRequest>>,
) -> AppResult<Json<Value>> {
    let owner = caller.require()?;
    let id = path_id(id)?;
    let Payload(RenameRequest { title }) = payload?;
    owned_session(&db_pool, id, &owner).await?;
    sessions::rename(&db_pool, id, &title).await?;

    Ok(Json(json!({ "success": true })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn pin_session(
    State(db_pool): State<SqlitePool>,
    caller: Caller,
    id: IdPath,
    payload: Checked<Payload<PinRequest>>,
) -> AppResult<Json<Value>> {
    let owner = caller.require()?;
    let id = path_id(id)?;
    let Payload(PinRequest { is_pinned }) = payload?;
    owned_session(&db_pool, id, &owner).await?;
    sessions::set_pinned(&db_pool, id, is_pinned).await?;

    Ok(Json(json!({ "success": true })))
}
