pub mod api;
pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod gateway;
pub mod identity;
pub mod index;
pub mod res;
pub mod session;
pub mod store;
pub mod telemetry;

use axum::{Router, extract::FromRef, routing::get};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub gateway: gateway::SharedGateway,
}

pub fn app(app_state: AppState, session_layer: SessionManagerLayer<MemoryStore>) -> Router {
    Router::new()
        .route("/", get(index::index))
        .merge(auth::router())
        .nest("/api", api::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
