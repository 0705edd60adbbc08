use axum::{
    Json, debug_handler,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use super::{
    payload::{ChatRequest, Checked, IdPath, Payload, path_id},
    sessions::{owned_session, unauthorized_empty},
};
use crate::{
    AppResult,
    gateway::SharedGateway,
    identity::Caller,
    store::{Role, messages},
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    State(db_pool): State<SqlitePool>,
    Caller(caller): Caller,
    id: IdPath,
) -> AppResult<Response> {
    let Some(owner) = caller else {
        return Ok(unauthorized_empty());
    };
    let id = path_id(id)?;
    owned_session(&db_pool, id, &owner).await?;

    Ok(Json(messages::list(&db_pool, id).await?).into_response())
}

/// One turn: user message in, reply out, both persisted. The reply is stored
/// even when it is the gateway's fallback text.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat(
    State(db_pool): State<SqlitePool>,
    State(gateway): State<SharedGateway>,
    caller: Caller,
    payload: Checked<Payload<ChatRequest>>,
) -> AppResult<Json<Value>> {
    let owner = caller.require()?;
    let Payload(ChatRequest { session_id, message }) = payload?;
    owned_session(&db_pool, session_id, &owner).await?;

    let history = messages::list(&db_pool, session_id).await?;
    messages::append(&db_pool, session_id, Role::User, &message).await?;

    let response = gateway.respond(&history, &message).await;
    messages::append(&db_pool, session_id, Role::Assistant, &response).await?;

    tracing::info!(%session_id, prior_turns = history.len(), "chat turn completed");
    Ok(Json(json!({ "response": response })))
}
