//! Request bodies. Each one is checked before any handler touches the store.

use axum::{
    Json,
    extract::{FromRequest, Path, Request, rejection::PathRejection},
};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::AppError;

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// JSON body that deserialized and passed [`Validate`]; anything else is a 400.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Payload(value))
    }
}

/// Body or path that failed to parse, held until the caller has been identified.
/// Anonymous requests are turned away before their shape is judged.
pub type Checked<T> = Result<T, AppError>;

pub type IdPath = Result<Path<Uuid>, PathRejection>;

pub fn path_id(path: IdPath) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        required("email", &self.email)?;
        required("password", &self.password)?;
        if !self.email.contains('@') {
            return Err("email is not valid".to_owned());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        required("email", &self.email)?;
        required("password", &self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

impl Validate for RenameRequest {
    fn validate(&self) -> Result<(), String> {
        required("title", &self.title)
    }
}

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub is_pinned: bool,
}

impl Validate for PinRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Uuid,
    pub message: String,
}

impl Validate for ChatRequest {
    fn validate(&self) -> Result<(), String> {
        required("message", &self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_needs_email_and_password() {
        let ok = RegisterRequest { email: "a@b.c".into(), password: "pw".into(), name: None };
        assert!(ok.validate().is_ok());

        let blank = RegisterRequest { email: "a@b.c".into(), password: "  ".into(), name: None };
        assert_eq!(blank.validate().unwrap_err(), "password is required");

        let bad = RegisterRequest { email: "not-an-email".into(), password: "pw".into(), name: None };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn chat_needs_message() {
        let req: ChatRequest =
            serde_json::from_str(&format!(r#"{{"session_id":"{}","message":""}}"#, Uuid::nil())).unwrap();
        assert_eq!(req.validate().unwrap_err(), "message is required");
    }

    #[test]
    fn pin_rejects_non_boolean() {
        assert!(serde_json::from_str::<PinRequest>(r#"{"is_pinned":"yes"}"#).is_err());
        assert!(serde_json::from_str::<PinRequest>(r#"{"is_pinned":true}"#).unwrap().is_pinned);
    }
}
