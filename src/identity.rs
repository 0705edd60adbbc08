//! Who is calling: a logged-in account (cookie session) or an anonymous guest (header token).

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use serde::Serialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppError, AppResult, session::USER_ID};

pub const GUEST_HEADER: &str = "x-guest-id";
const MAX_GUEST_ID_LEN: usize = 128;

/// Owner of a chat session. Serializes as `{"user_id": ..}` or `{"guest_id": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Identity {
    #[serde(rename = "user_id")]
    Account(Uuid),
    #[serde(rename = "guest_id")]
    Guest(String),
}

/// Account beats guest; no evidence at all is `None`, never a default identity.
pub fn resolve(account_id: Option<Uuid>, headers: &HeaderMap) -> Option<Identity> {
    if let Some(id) = account_id {
        return Some(Identity::Account(id));
    }
    guest_token(headers).map(Identity::Guest)
}

fn guest_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(GUEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })?;

    let token = raw.trim();
    if token.is_empty() || token.len() > MAX_GUEST_ID_LEN {
        return None;
    }
    Some(token.to_owned())
}

/// Extractor for the resolved caller.
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn require(self) -> AppResult<Identity> {
        self.0.ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;
        let account_id = session.get::<Uuid>(USER_ID).await?;

        Ok(Caller(resolve(account_id, &parts.headers)))
    }
}
