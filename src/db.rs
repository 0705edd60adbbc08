use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

/// Opens the pool and brings the schema up to date.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(5));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!(database_url, "database ready");

    Ok(db_pool)
}

/// Single-connection in-memory pool; every connection to `:memory:` is its own database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&db_pool).await.unwrap();
    db_pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_create_tables() {
        let db_pool = memory_pool().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&db_pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(names, ["accounts", "messages", "sessions"]);
    }

    #[tokio::test]
    async fn session_needs_exactly_one_owner() {
        let db_pool = memory_pool().await;

        let both = sqlx::query("INSERT INTO sessions (id,user_id,guest_id,title) VALUES ('a','u','g','t')")
            .execute(&db_pool)
            .await;
        assert!(both.is_err());

        let neither = sqlx::query("INSERT INTO sessions (id,title) VALUES ('b','t')")
            .execute(&db_pool)
            .await;
        assert!(neither.is_err());
    }
}
