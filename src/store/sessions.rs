use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::StoreResult;
use crate::identity::Identity;

pub const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    #[serde(flatten)]
    pub owner: Identity,
    pub title: String,
    pub is_pinned: bool,
    pub created_at: String,
}

type SessionRow = (String, Option<String>, Option<String>, String, bool, String);

const SELECT_SESSION: &str = "SELECT id,user_id,guest_id,title,is_pinned,created_at FROM sessions";

fn session_from_row((id, user_id, guest_id, title, is_pinned, created_at): SessionRow) -> StoreResult<ChatSession> {
    let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let owner = match (user_id, guest_id) {
        (Some(user_id), None) => {
            Identity::Account(Uuid::parse_str(&user_id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?)
        }
        (None, Some(guest_id)) => Identity::Guest(guest_id),
        _ => return Err(sqlx::Error::Decode(format!("session {id} has no single owner").into()).into()),
    };

    Ok(ChatSession { id, owner, title, is_pinned, created_at })
}

fn owner_columns(owner: &Identity) -> (Option<String>, Option<&str>) {
    match owner {
        Identity::Account(id) => (Some(id.to_string()), None),
        Identity::Guest(id) => (None, Some(id.as_str())),
    }
}

pub async fn create(db_pool: &SqlitePool, owner: &Identity, title: &str) -> StoreResult<Uuid> {
    let id = Uuid::now_v7();
    let (user_id, guest_id) = owner_columns(owner);

    sqlx::query("INSERT INTO sessions (id,user_id,guest_id,title) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(user_id)
        .bind(guest_id)
        .bind(title)
        .execute(db_pool)
        .await?;

    tracing::debug!(%id, ?owner, "session created");
    Ok(id)
}

const LIST_BY_ACCOUNT: &str = "SELECT id,user_id,guest_id,title,is_pinned,created_at FROM sessions \
    WHERE user_id=? ORDER BY is_pinned DESC, created_at DESC, rowid DESC";
const LIST_BY_GUEST: &str = "SELECT id,user_id,guest_id,title,is_pinned,created_at FROM sessions \
    WHERE guest_id=? AND user_id IS NULL ORDER BY is_pinned DESC, created_at DESC, rowid DESC";

/// Pinned first, then newest first. Guest listings skip anything carrying an account owner.
pub async fn list(db_pool: &SqlitePool, owner: &Identity) -> StoreResult<Vec<ChatSession>> {
    let query = match owner {
        Identity::Account(id) => sqlx::query_as::<_, SessionRow>(LIST_BY_ACCOUNT).bind(id.to_string()),
        Identity::Guest(id) => sqlx::query_as::<_, SessionRow>(LIST_BY_GUEST).bind(id.clone()),
    };

    query
        .fetch_all(db_pool)
        .await?
        .into_iter()
        .map(session_from_row)
        .collect()
}

pub async fn find(db_pool: &SqlitePool, id: Uuid) -> StoreResult<Option<ChatSession>> {
    sqlx::query_as::<_, SessionRow>(&format!("{SELECT_SESSION} WHERE id=?"))
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await?
        .map(session_from_row)
        .transpose()
}

pub async fn rename(db_pool: &SqlitePool, id: Uuid, title: &str) -> StoreResult<()> {
    sqlx::query("UPDATE sessions SET title=? WHERE id=?")
        .bind(title)
        .bind(id.to_string())
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn set_pinned(db_pool: &SqlitePool, id: Uuid, is_pinned: bool) -> StoreResult<()> {
    sqlx::query("UPDATE sessions SET is_pinned=? WHERE id=?")
        .bind(is_pinned)
        .bind(id.to_string())
        .execute(db_pool)
        .await?;
    Ok(())
}

/// Removes the session's messages, then the session, in one transaction.
pub async fn delete(db_pool: &SqlitePool, id: Uuid) -> StoreResult<()> {
    let mut tx = db_pool.begin().await?;

    let removed = sqlx::query("DELETE FROM messages WHERE session_id=?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM sessions WHERE id=?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::debug!(%id, messages = removed, "session deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::store::{Role, messages};

    fn guest(id: &str) -> Identity {
        Identity::Guest(id.to_owned())
    }

    #[tokio::test]
    async fn create_tags_exactly_one_owner() {
        let db_pool = memory_pool().await;
        let account = Identity::Account(Uuid::now_v7());

        let a = create(&db_pool, &account, DEFAULT_TITLE).await.unwrap();
        let g = create(&db_pool, &guest("g1"), DEFAULT_TITLE).await.unwrap();

        let a = find(&db_pool, a).await.unwrap().unwrap();
        let g = find(&db_pool, g).await.unwrap().unwrap();
        assert_eq!(a.owner, account);
        assert_eq!(a.title, "New Chat");
        assert!(!a.is_pinned);
        assert_eq!(g.owner, guest("g1"));
    }

    #[tokio::test]
    async fn listing_is_pinned_then_newest() {
        let db_pool = memory_pool().await;
        let owner = guest("g1");

        let oldest = create(&db_pool, &owner, "oldest").await.unwrap();
        let middle = create(&db_pool, &owner, "middle").await.unwrap();
        let newest = create(&db_pool, &owner, "newest").await.unwrap();
        set_pinned(&db_pool, oldest, true).await.unwrap();

        let ids: Vec<Uuid> = list(&db_pool, &owner).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, [oldest, newest, middle]);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_owner() {
        let db_pool = memory_pool().await;
        let account_id = Uuid::now_v7();
        let account = Identity::Account(account_id);

        create(&db_pool, &account, "mine").await.unwrap();
        create(&db_pool, &guest("g1"), "guest one").await.unwrap();
        create(&db_pool, &guest("g2"), "guest two").await.unwrap();

        let titles = |v: Vec<ChatSession>| v.into_iter().map(|s| s.title).collect::<Vec<_>>();
        assert_eq!(titles(list(&db_pool, &account).await.unwrap()), ["mine"]);
        assert_eq!(titles(list(&db_pool, &guest("g1")).await.unwrap()), ["guest one"]);

        // a guest token that happens to equal an account id sees nothing of that account
        let impostor = guest(&account_id.to_string());
        assert!(list(&db_pool, &impostor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_and_pin_are_idempotent() {
        let db_pool = memory_pool().await;
        let owner = guest("g1");
        let id = create(&db_pool, &owner, DEFAULT_TITLE).await.unwrap();

        for _ in 0..2 {
            rename(&db_pool, id, "Renamed").await.unwrap();
            set_pinned(&db_pool, id, true).await.unwrap();
        }

        let sessions = list(&db_pool, &owner).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "Renamed");
        assert!(sessions[0].is_pinned);

        set_pinned(&db_pool, id, false).await.unwrap();
        assert!(!find(&db_pool, id).await.unwrap().unwrap().is_pinned);
    }

    #[tokio::test]
    async fn delete_removes_messages() {
        let db_pool = memory_pool().await;
        let owner = guest("g1");
        let id = create(&db_pool, &owner, DEFAULT_TITLE).await.unwrap();
        let other = create(&db_pool, &owner, DEFAULT_TITLE).await.unwrap();

        messages::append(&db_pool, id, Role::User, "hi").await.unwrap();
        messages::append(&db_pool, id, Role::Assistant, "hello").await.unwrap();
        messages::append(&db_pool, other, Role::User, "keep me").await.unwrap();

        delete(&db_pool, id).await.unwrap();

        assert!(find(&db_pool, id).await.unwrap().is_none());
        assert!(messages::list(&db_pool, id).await.unwrap().is_empty());
        assert_eq!(messages::list(&db_pool, other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_unknown_session_is_ok() {
        let db_pool = memory_pool().await;
        delete(&db_pool, Uuid::now_v7()).await.unwrap();
    }
}
