//! Database module - SQLite snapshot storage for the combat session

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info};

use crate::session::SessionSnapshot;

/// Row key the session snapshot is stored under
pub const SESSION_KEY: &str = "dnd_combat_manager_state_v1";

/// Failure while saving or loading the session snapshot
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Database handle wrapping SQLite connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    /// If path is None, uses in-memory database (for testing)
    pub async fn new(path: Option<&str>) -> Result<Self> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // An in-memory database vanishes with its last connection
        let pool_options = match path {
            Some(_) => SqlitePoolOptions::new().max_connections(4),
            None => SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>),
        };

        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Write the full session snapshot, replacing any previous one
    pub async fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), PersistenceError> {
        let value = serde_json::to_string(snapshot)?;
        sqlx::query(
            r#"
            INSERT INTO session_state (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(SESSION_KEY)
        .bind(&value)
        .execute(&self.pool)
        .await?;

        debug!(
            "Saved session snapshot ({} combatants, round {})",
            snapshot.combatants.len(),
            snapshot.round
        );
        Ok(())
    }

    /// Read the stored session snapshot, if one exists
    pub async fn load_snapshot(&self) -> Result<Option<SessionSnapshot>, PersistenceError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM session_state WHERE key = ?")
            .bind(SESSION_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Store raw snapshot text, bypassing encoding
    #[cfg(test)]
    pub(crate) async fn save_raw(&self, value: &str) -> Result<(), PersistenceError> {
        sqlx::query("INSERT OR REPLACE INTO session_state (key, value) VALUES (?, ?)")
            .bind(SESSION_KEY)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
