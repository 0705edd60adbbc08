//! Durable records behind the API: accounts, chat sessions and their messages.
//!
//! Every operation takes the pool by reference and returns a [`StoreResult`];
//! the API layer decides how each error kind maps onto HTTP.

pub mod accounts;
pub mod messages;
pub mod password;
pub mod sessions;

use thiserror::Error;

pub use accounts::{Account, AuthProvider, NewAccount};
pub use messages::{Message, Role};
pub use sessions::ChatSession;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("local accounts need a password")]
    PasswordRequired,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateEmail,
            _ => StoreError::Database(err),
        }
    }
}
