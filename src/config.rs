use std::{path::PathBuf, time::Duration};

use anyhow::Context;

/// Process settings, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Base for OAuth redirect urls.
    pub public_url: String,
    pub oauth_clients_file: PathBuf,
    pub session_secure: bool,
    pub session_idle_minutes: i64,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

fn var_or(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("{key}={raw:?} is not valid")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        let api_key = dotenv::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty());

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://chat.db?mode=rwc"),
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8080"),
            public_url: var_or("PUBLIC_URL", "http://localhost:8080").trim_end_matches('/').to_owned(),
            oauth_clients_file: var_or("OAUTH_CLIENTS_FILE", "client_secret.json").into(),
            session_secure: parsed_or("SESSION_SECURE", false)?,
            session_idle_minutes: parsed_or("SESSION_IDLE_MINUTES", 60)?,
            gemini: GeminiConfig {
                api_key,
                model: var_or("GEMINI_MODEL", "gemini-2.5-flash"),
                base_url: var_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com/v1beta"),
                timeout: Duration::from_secs(parsed_or("GEMINI_TIMEOUT_SECS", 60)?),
            },
        })
    }
}
