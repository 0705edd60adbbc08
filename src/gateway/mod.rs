//! Boundary to the generative-language service.
//!
//! [`ConversationGateway::respond`] always produces text: failures come back
//! as a readable message so the chat turn still gets an assistant reply.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::Message;

pub use gemini::GeminiGateway;

pub const NOT_INITIALIZED: &str = "The AI service is not initialized. Please check the server configuration.";

#[async_trait]
pub trait ConversationGateway: Send + Sync {
    /// `history` is the session's messages, oldest first, without `new_user_text`.
    async fn respond(&self, history: &[Message], new_user_text: &str) -> String;
}

pub type SharedGateway = Arc<dyn ConversationGateway>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no API key configured")]
    Misconfigured,

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("service answered {status}: {message}")]
    Api { status: u16, message: String },

    #[error("service returned no text")]
    EmptyResponse,
}

/// What the user sees in place of a reply when the call failed.
pub fn fallback_reply(err: &GatewayError) -> String {
    match err {
        GatewayError::Misconfigured => NOT_INITIALIZED.to_owned(),
        other => format!("I'm having trouble connecting right now. Error: {other}"),
    }
}
