//! Accounts: email/password under `/api`, Google and GitHub through OAuth.

mod callback;
mod clients;
mod local;
mod login;
mod logout;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use clients::{ClientProvider, Clients};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(local::register))
        .route("/api/login", post(local::login))
        .route("/api/logout", post(logout::logout))
        .route("/api/check_auth", get(local::check_auth))
        .route("/login/{provider}", get(login::login))
        .route("/auth/callback/{provider}", get(callback::callback))
}
