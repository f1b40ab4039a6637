//! # SQLite
//!
//! Single relational store shared by every component.
//!
//! ## Tables
//!
//! - `users`: credentials and roles, unique usernames
//! - `nominations`: free-text submissions, many per (name, year)
//! - `ballot_selections`: one row per (user, name, year), cascaded away with the user
//!
//! Row-level uniqueness constraints are what keep the invariants under concurrent
//! writers. There is no application-level locking.
use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

use crate::error::Result;

#[derive(Clone, Debug)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Store { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{database_url}")
        };

        let options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true);

        info!("Opening database at {url}");
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Ok(Store { pool })
    }

    /// Each in-memory connection is its own database, so the pool is pinned to one
    /// connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Store { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    let store = Store::in_memory().await.expect("open in-memory store");
    store.migrate().await.expect("run migrations");
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations() {
        let store = test_store().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx%'",
        )
        .fetch_all(&store.pool)
        .await
        .expect("query tables");
        let names: Vec<String> = tables.into_iter().map(|t| t.0).collect();

        for table in ["users", "nominations", "ballot_selections"] {
            assert!(names.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_migrate_twice() {
        let store = test_store().await;
        store.migrate().await.expect("second migrate is a no-op");
    }
}
