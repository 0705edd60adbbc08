use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::StoreResult;

const TITLE_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Anything that is not `user` reads back as the assistant side.
    fn from_stored(role: &str) -> Self {
        if role == "user" { Role::User } else { Role::Assistant }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub session_id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

/// First 30 characters, with `...` appended only when something was cut.
pub fn derive_title(content: &str) -> String {
    match content.char_indices().nth(TITLE_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_owned(),
    }
}

/// Appends one turn. A user message that leaves the session with at most one
/// message also becomes the session title.
pub async fn append(db_pool: &SqlitePool, session_id: Uuid, role: Role, content: &str) -> StoreResult<i64> {
    let session_id_text = session_id.to_string();
    let mut tx = db_pool.begin().await?;

    let id = sqlx::query("INSERT INTO messages (session_id,role,content) VALUES (?,?,?)")
        .bind(&session_id_text)
        .bind(role.as_str())
        .bind(content)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    if role == Role::User {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE session_id=?")
            .bind(&session_id_text)
            .fetch_one(&mut *tx)
            .await?;

        if count <= 1 {
            let title = derive_title(content);
            sqlx::query("UPDATE sessions SET title=? WHERE id=?")
                .bind(&title)
                .bind(&session_id_text)
                .execute(&mut *tx)
                .await?;
            tracing::debug!(%session_id, %title, "session auto-titled");
        }
    }

    tx.commit().await?;
    Ok(id)
}

/// Oldest first; an unknown session is just empty.
pub async fn list(db_pool: &SqlitePool, session_id: Uuid) -> StoreResult<Vec<Message>> {
    let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
        "SELECT id,role,content,created_at FROM messages WHERE session_id=? ORDER BY created_at ASC, id ASC",
    )
    .bind(session_id.to_string())
    .fetch_all(db_pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, role, content, created_at)| Message {
            id,
            session_id,
            role: Role::from_stored(&role),
            content,
            created_at,
        })
        .collect())
}
