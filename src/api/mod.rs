mod chat;
pub mod payload;
mod sessions;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(sessions::list_sessions).post(sessions::create_session))
        .route("/sessions/{id}", delete(sessions::delete_session))
        .route("/sessions/{id}/rename", post(sessions::rename_session))
        .route("/sessions/{id}/pin", post(sessions::pin_session))
        .route("/history/{id}", get(chat::history))
        .route("/chat", post(chat::chat))
}
