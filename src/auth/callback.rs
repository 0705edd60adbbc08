use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::Redirect,
};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppError, AppResult,
    session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
    store::accounts,
};

use super::{Clients, clients::ClientProvider, local::sign_in};

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// What the provider tells us about the person who just logged in.
#[derive(Debug, PartialEq)]
pub(crate) struct SocialProfile {
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) avatar: Option<String>,
}

#[derive(Deserialize)]
struct GoogleUser {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

fn primary_github_email(emails: Vec<GithubEmail>) -> Option<String> {
    emails
        .into_iter()
        .filter(|e| e.verified)
        .max_by_key(|e| e.primary)
        .map(|e| e.email)
}

async fn fetch_profile(
    http_client: &reqwest::Client,
    provider: ClientProvider,
    access_token: &str,
) -> AppResult<SocialProfile> {
    match provider {
        ClientProvider::Google => {
            let user: GoogleUser = http_client
                .get("https://www.googleapis.com/oauth2/v2/userinfo")
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(SocialProfile {
                email: user.email.ok_or("Google account has no email")?,
                name: user.name,
                avatar: user.picture,
            })
        }
        ClientProvider::Github => {
            let user: GithubUser = http_client
                .get("https://api.github.com/user")
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let email = match user.email {
                Some(email) => email,
                None => {
                    let emails: Vec<GithubEmail> = http_client
                        .get("https://api.github.com/user/emails")
                        .bearer_auth(access_token)
                        .send()
                        .await?
                        .error_for_status()?
                        .json()
                        .await?;
                    primary_github_email(emails).ok_or("GitHub account has no verified email")?
                }
            };
            Ok(SocialProfile {
                email,
                name: user.name.or(Some(user.login)),
                avatar: user.avatar_url,
            })
        }
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn callback(
    Path(provider): Path<ClientProvider>,
    Query(CallbackQuery { state, code, error }): Query<CallbackQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Redirect> {
    if let Some(error) = error {
        return Err(AppError::BadRequest(format!("{provider} login failed: {error}")));
    }
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err("no csrf_state".into());
    };
    if state.secret().as_str() != stored_state.as_str() {
        return Err("csrf tokens don't match".into());
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier".into());
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let profile = fetch_profile(&http_client, provider, token_result.access_token().secret()).await?;
    let name = profile.name.unwrap_or_else(accounts::random_alias);
    let account = accounts::get_or_create_social(
        &db_pool,
        &profile.email,
        &name,
        provider.into(),
        profile.avatar.as_deref(),
    )
    .await?;

    let return_url = session.remove::<String>(RETURN_URL).await?;
    sign_in(&session, account.id).await?;

    tracing::info!(id = %account.id, %provider, "welcome");
    Ok(Redirect::to(return_url.as_deref().unwrap_or("/")))
}
