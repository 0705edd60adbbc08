use axum::{Json, debug_handler, extract::State};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult,
    api::payload::{LoginRequest, Payload, RegisterRequest},
    session::USER_ID,
    store::{NewAccount, StoreError, accounts},
};

/// Fresh session id on every login, then remember the account.
pub(crate) async fn sign_in(session: &Session, account_id: Uuid) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, account_id).await?;
    Ok(())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Payload(RegisterRequest { email, password, name }): Payload<RegisterRequest>,
) -> AppResult<Json<Value>> {
    let name = name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let user_id = accounts::register(&db_pool, NewAccount::local(&email, &password, name)).await?;
    sign_in(&session, user_id).await?;

    Ok(Json(json!({ "success": true, "user_id": user_id })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Payload(LoginRequest { email, password }): Payload<LoginRequest>,
) -> AppResult<Json<Value>> {
    let user = accounts::authenticate(&db_pool, &email, &password).await?;
    sign_in(&session, user.id).await?;

    tracing::info!(id = %user.id, "welcome back");
    Ok(Json(json!({ "success": true, "user": user })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn check_auth(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
        return Ok(Json(json!({ "authenticated": false })));
    };

    match accounts::get_by_id(&db_pool, user_id).await {
        Ok(user) => Ok(Json(json!({
            "authenticated": true,
            "user_id": user.id,
            "name": user.name,
            "avatar": user.avatar,
        }))),
        // cookie outlived its account row
        Err(StoreError::NotFound(_)) => {
            session.remove::<Uuid>(USER_ID).await?;
            Ok(Json(json!({ "authenticated": false })))
        }
        Err(e) => Err(e.into()),
    }
}
