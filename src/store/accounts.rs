use std::{fmt, str::FromStr};

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{StoreError, StoreResult, password};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Local,
    Google,
    Github,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        use AuthProvider::*;
        match self {
            Local => "local",
            Google => "google",
            Github => "github",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            "github" => Ok(AuthProvider::Github),
            other => Err(format!("unknown auth provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub provider: AuthProvider,
    pub created_at: String,

    #[serde(skip)]
    pub(crate) password_hash: Option<String>,
}

impl Account {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password: Option<&'a str>,
    pub name: Option<&'a str>,
    pub provider: AuthProvider,
    pub avatar: Option<&'a str>,
}

impl<'a> NewAccount<'a> {
    pub fn local(email: &'a str, password: &'a str, name: Option<&'a str>) -> Self {
        NewAccount {
            email,
            password: Some(password),
            name,
            provider: AuthProvider::Local,
            avatar: None,
        }
    }
}

type AccountRow = (String, String, Option<String>, Option<String>, Option<String>, String, String);

const SELECT_ACCOUNT: &str = "SELECT id,email,password_hash,name,avatar,provider,created_at FROM accounts";

fn account_from_row((id, email, password_hash, name, avatar, provider, created_at): AccountRow) -> StoreResult<Account> {
    let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let provider = provider
        .parse()
        .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

    Ok(Account { id, email, name, avatar, provider, created_at, password_hash })
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Inserts a new account and returns its id; an email already on file is `DuplicateEmail`.
pub async fn register(db_pool: &SqlitePool, new: NewAccount<'_>) -> StoreResult<Uuid> {
    if new.password.is_none() && new.provider == AuthProvider::Local {
        return Err(StoreError::PasswordRequired);
    }

    let password_hash = match new.password {
        Some(password) => Some(password::hash(password).await?),
        None => None,
    };

    let id = Uuid::now_v7();
    let email = normalize_email(new.email);
    sqlx::query("INSERT INTO accounts (id,email,password_hash,name,avatar,provider) VALUES (?,?,?,?,?,?)")
        .bind(id.to_string())
        .bind(&email)
        .bind(password_hash)
        .bind(new.name)
        .bind(new.avatar)
        .bind(new.provider.as_str())
        .execute(db_pool)
        .await
        .map_err(StoreError::from_insert)?;

    tracing::info!(%id, %email, provider = %new.provider, "account registered");
    Ok(id)
}

pub async fn find_by_email(db_pool: &SqlitePool, email: &str) -> StoreResult<Option<Account>> {
    sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE email=?"))
        .bind(normalize_email(email))
        .fetch_optional(db_pool)
        .await?
        .map(account_from_row)
        .transpose()
}

pub async fn get_by_id(db_pool: &SqlitePool, id: Uuid) -> StoreResult<Account> {
    sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE id=?"))
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await?
        .map(account_from_row)
        .transpose()?
        .ok_or(StoreError::NotFound("Account"))
}

/// Unknown email, passwordless account and wrong password all look the same to the caller.
pub async fn authenticate(db_pool: &SqlitePool, email: &str, password: &str) -> StoreResult<Account> {
    let Some(account) = find_by_email(db_pool, email).await? else {
        return Err(StoreError::InvalidCredentials);
    };
    let Some(stored_hash) = account.password_hash.as_deref() else {
        return Err(StoreError::InvalidCredentials);
    };

    if password::verify(password, stored_hash).await? {
        Ok(account)
    } else {
        Err(StoreError::InvalidCredentials)
    }
}

/// Looks the email up and returns that account untouched, or registers a passwordless one.
pub async fn get_or_create_social(
    db_pool: &SqlitePool,
    email: &str,
    name: &str,
    provider: AuthProvider,
    avatar: Option<&str>,
) -> StoreResult<Account> {
    if let Some(account) = find_by_email(db_pool, email).await? {
        tracing::debug!(id = %account.id, %provider, "social login for existing account");
        return Ok(account);
    }

    let new = NewAccount {
        email,
        password: None,
        name: Some(name),
        provider,
        avatar,
    };
    let id = match register(db_pool, new).await {
        Ok(id) => id,
        // lost the race against a concurrent first login
        Err(StoreError::DuplicateEmail) => {
            return find_by_email(db_pool, email).await?.ok_or(StoreError::NotFound("Account"));
        }
        Err(e) => return Err(e),
    };

    get_by_id(db_pool, id).await
}

/// Display name for social accounts whose provider shares none.
pub fn random_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).copied().unwrap_or("Nameless"),
        nouns.choose(&mut rng).copied().unwrap_or("User"),
    )
}
