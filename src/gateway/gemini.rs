use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};

use super::{ConversationGateway, GatewayError, fallback_reply};
use crate::{
    config::GeminiConfig,
    store::{Message, Role},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum GeminiRole {
    User,
    Model,
}

impl From<Role> for GeminiRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => GeminiRole::User,
            Role::Assistant => GeminiRole::Model,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Content {
    pub(crate) role: GeminiRole,
    pub(crate) parts: Vec<Part>,
}

impl Content {
    fn text(role: GeminiRole, text: &str) -> Self {
        Content {
            role,
            parts: vec![Part { text: Some(text.to_owned()) }],
        }
    }
}

impl From<&Message> for Content {
    fn from(msg: &Message) -> Self {
        Content::text(msg.role.into(), &msg.content)
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Prior turns in order, then the new user text as the newest turn.
    pub(crate) fn new(history: &[Message], new_user_text: &str) -> Self {
        let mut contents: Vec<Content> = history.iter().map(Content::from).collect();
        contents.push(Content::text(GeminiRole::User, new_user_text));
        GenerateContentRequest { contents }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Clone, Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Clone, Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

struct GeminiClient {
    http: reqwest::Client,
    url: String,
}

/// `generateContent` over REST. Without an API key it stays uninitialized and
/// answers every turn with [`super::NOT_INITIALIZED`].
pub struct GeminiGateway {
    client: Option<GeminiClient>,
}

impl GeminiGateway {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let Some(api_key) = config.api_key.as_deref() else {
            tracing::warn!("GEMINI_API_KEY is not set; chat replies will report the service as unavailable");
            return Ok(GeminiGateway { client: None });
        };

        let mut headers = header::HeaderMap::new();
        let mut key = header::HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        tracing::info!(model = %config.model, "gemini gateway initialized");
        Ok(GeminiGateway {
            client: Some(GeminiClient { http, url }),
        })
    }

    async fn try_respond(&self, history: &[Message], new_user_text: &str) -> Result<String, GatewayError> {
        let client = self.client.as_ref().ok_or(GatewayError::Misconfigured)?;

        let request = GenerateContentRequest::new(history, new_user_text);
        let response = client.http.post(&client.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Api { status: status.as_u16(), message });
        }

        response
            .json::<GenerateContentResponse>()
            .await?
            .into_text()
            .ok_or(GatewayError::EmptyResponse)
    }
}

#[async_trait]
impl ConversationGateway for GeminiGateway {
    async fn respond(&self, history: &[Message], new_user_text: &str) -> String {
        match self.try_respond(history, new_user_text).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, turns = history.len(), "gemini call failed");
                fallback_reply(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Json, Router, http::{HeaderMap, StatusCode}, routing::post};
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;
    use crate::gateway::NOT_INITIALIZED;

    fn message(role: Role, content: &str) -> Message {
        Message {
            id: 0,
            session_id: Uuid::nil(),
            role,
            content: content.to_owned(),
            created_at: String::new(),
        }
    }

    fn config(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_owned()),
            model: "gemini-test".to_owned(),
            base_url: base_url.to_owned(),
            timeout: Duration::from_secs(5),
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    /// Answers with the roles and texts it was sent, so tests can see the request.
    async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
            return (StatusCode::FORBIDDEN, Json(json!({"error": {"message": "bad key"}})));
        }
        let summary: Vec<String> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| format!("{}:{}", c["role"].as_str().unwrap(), c["parts"][0]["text"].as_str().unwrap()))
            .collect();
        (
            StatusCode::OK,
            Json(json!({"candidates": [{"content": {"role": "model", "parts": [{"text": summary.join("|")}]}}]})),
        )
    }

    #[test]
    fn request_maps_roles_and_appends_new_turn() {
        let history = [message(Role::User, "hi"), message(Role::Assistant, "hello")];
        let request = GenerateContentRequest::new(&history, "how are you?");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({"contents": [
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "model", "parts": [{"text": "hello"}]},
                {"role": "user", "parts": [{"text": "how are you?"}]},
            ]})
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Hello, world"));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({"promptFeedback": {}})).unwrap();
        assert_eq!(blocked.into_text(), None);
    }

    #[tokio::test]
    async fn missing_key_reports_not_initialized() {
        let gateway = GeminiGateway::new(&GeminiConfig { api_key: None, ..config("http://unused") }).unwrap();
        assert_eq!(gateway.respond(&[], "hello").await, NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn sends_history_then_new_turn() {
        let base_url = serve(Router::new().route("/models/{call}", post(echo))).await;
        let gateway = GeminiGateway::new(&config(&base_url)).unwrap();

        let history = [message(Role::User, "hi"), message(Role::Assistant, "hello")];
        let reply = gateway.respond(&history, "again").await;
        assert_eq!(reply, "user:hi|model:hello|user:again");
    }

    #[tokio::test]
    async fn api_error_becomes_reply_with_detail() {
        let router = Router::new().route(
            "/models/{call}",
            post(|| async {
                (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": {"message": "quota exhausted"}})))
            }),
        );
        let gateway = GeminiGateway::new(&config(&serve(router).await)).unwrap();

        let reply = gateway.respond(&[], "hello").await;
        assert!(reply.starts_with("I'm having trouble connecting right now. Error:"));
        assert!(reply.contains("quota exhausted"));
    }

    #[tokio::test]
    async fn unreachable_service_becomes_reply() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = GeminiGateway::new(&config(&format!("http://{addr}"))).unwrap();
        let reply = gateway.respond(&[], "hello").await;
        assert!(reply.contains("Error:"));
    }
}
