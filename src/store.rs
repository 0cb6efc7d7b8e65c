use serde::Serialize;
use sqlx::SqlitePool;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::AppResult;

/// One persisted chat message. `id` is assigned by the database and is the
/// authoritative order; `timestamp` is informational only.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub filename: Option<String>,
    pub text: String,
    pub timestamp: String,
}

/// Append-only log of messages backed by sqlite.
#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the messages table if it isn't there yet. Safe to call on
    /// every start. Runs after `SessionGate::init`, which owns the users
    /// table this one references.
    pub async fn init(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY,
                sender_id INTEGER NOT NULL REFERENCES users(id),
                filename TEXT,
                text TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a message and hand back the stored row, id included. The
    /// insert assigns the next id atomically, so two concurrent appends can
    /// never share one.
    pub async fn append(
        &self,
        sender_id: i64,
        text: &str,
        filename: Option<&str>,
        timestamp: OffsetDateTime,
    ) -> AppResult<Message> {
        let timestamp = timestamp
            .format(&Rfc3339)
            .map_err(anyhow::Error::from)?;

        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (sender_id, filename, text, timestamp)
             VALUES (?, ?, ?, ?)
             RETURNING id, sender_id, filename, text, timestamp",
        )
        .bind(sender_id)
        .bind(filename)
        .bind(text)
        .bind(&timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// Full history in ascending id order.
    pub async fn list_all(&self) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT id, sender_id, filename, text, timestamp
             FROM messages ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
