use std::{fmt, path::Path};

use anyhow::Context;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenUrl,
    basic::BasicClient,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{AppResult, store::AuthProvider};

type ProviderClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    pub fn id(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    fn auth_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://accounts.google.com/o/oauth2/auth",
            Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://oauth2.googleapis.com/token",
            Github => "https://github.com/login/oauth/access_token",
        }
    }

    pub fn scopes(&self) -> Vec<Scope> {
        use ClientProvider::*;
        let scopes: &[&str] = match self {
            Google => &["openid", "email", "profile"],
            Github => &["read:user", "user:email"],
        };
        scopes.iter().map(|s| Scope::new((*s).to_owned())).collect()
    }
}

impl From<ClientProvider> for AuthProvider {
    fn from(provider: ClientProvider) -> Self {
        match provider {
            ClientProvider::Google => AuthProvider::Google,
            ClientProvider::Github => AuthProvider::Github,
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderSecret {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Default, Deserialize)]
struct ClientsFile {
    google: Option<ProviderSecret>,
    github: Option<ProviderSecret>,
}

/// Configured OAuth clients; a provider without keys is simply unavailable.
#[derive(Clone, Default)]
pub struct Clients {
    google_client: Option<ProviderClient>,
    github_client: Option<ProviderClient>,
}

impl Clients {
    /// Reads `{"google": {...}, "github": {...}}`; a missing file means no social login.
    pub fn from_file(path: &Path, public_url: &str) -> anyhow::Result<Clients> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no OAuth clients file; social login disabled");
            return Ok(Clients::default());
        }
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Clients::from_json(serde_json::from_str(&raw)?, public_url)
    }

    pub fn from_json(json: Value, public_url: &str) -> anyhow::Result<Clients> {
        let file: ClientsFile = serde_json::from_value(json)?;

        let build = |provider: ClientProvider, secret: Option<ProviderSecret>| -> anyhow::Result<Option<ProviderClient>> {
            let Some(secret) = secret else {
                return Ok(None);
            };
            let redirect_url = format!("{public_url}/auth/callback/{provider}");
            tracing::info!(%provider, %redirect_url, "OAuth provider configured");

            Ok(Some(
                BasicClient::new(ClientId::new(secret.client_id))
                    .set_client_secret(ClientSecret::new(secret.client_secret))
                    .set_auth_uri(AuthUrl::new(provider.auth_url().to_owned())?)
                    .set_token_uri(TokenUrl::new(provider.token_url().to_owned())?)
                    .set_redirect_uri(RedirectUrl::new(redirect_url)?),
            ))
        };

        Ok(Clients {
            google_client: build(ClientProvider::Google, file.google)?,
            github_client: build(ClientProvider::Github, file.github)?,
        })
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<ProviderClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }
        .ok_or_else(|| format!("OAuth provider {provider} is not configured").into())
    }
}
