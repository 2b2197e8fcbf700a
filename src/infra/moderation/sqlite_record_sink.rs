// SQLite-backed record sink for persistent moderation data.
//
// Tables:
// - warnings: one row per warning issued against a user
// - action_log: append-only moderation action log

use crate::core::moderation::{AuditEntry, RecordSink, SinkError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

pub struct SqliteRecordSink {
    pool: Pool<Sqlite>,
}

impl SqliteRecordSink {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), SinkError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warnings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                moderator_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SinkError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_warnings_guild_user
                ON warnings(guild_id, user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SinkError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS action_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                action_type TEXT NOT NULL,
                target_id INTEGER NOT NULL,
                moderator_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SinkError::StorageError(e.to_string()))?;

        Ok(())
    }

    /// Number of warnings on record for a user (used by status displays).
    pub async fn warning_count(&self, guild_id: u64, user_id: u64) -> Result<u32, SinkError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM warnings WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SinkError::StorageError(e.to_string()))?;
        Ok(count as u32)
    }
}

#[async_trait]
impl RecordSink for SqliteRecordSink {
    async fn add_warning(
        &self,
        tenant_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<(), SinkError> {
        sqlx::query(
            r#"
            INSERT INTO warnings (guild_id, user_id, moderator_id, reason, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(tenant_id as i64)
        .bind(user_id as i64)
        .bind(moderator_id as i64)
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SinkError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn log_action(&self, entry: &AuditEntry, moderator_id: u64) -> Result<(), SinkError> {
        sqlx::query(
            r#"
            INSERT INTO action_log (guild_id, action_type, target_id, moderator_id, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.tenant_id as i64)
        .bind(entry.kind.as_str())
        .bind(entry.target_user_id as i64)
        .bind(moderator_id as i64)
        .bind(&entry.reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SinkError::StorageError(e.to_string()))?;
        Ok(())
    }
}
