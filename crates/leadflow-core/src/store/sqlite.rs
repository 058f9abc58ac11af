//! SQLite conversation store
//!
//! Conversations are stored as JSON documents next to their version column
//! (`updated_at` in microseconds since the epoch). A transition commit runs the
//! conditional update and the record insert in one transaction.
//!
//! ```no_run
//! use leadflow_core::store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Default location: ~/.leadflow/leadflow.db
//! let store = SqliteStore::new_default().await?;
//! # Ok(())
//! # }
//! ```

use super::{ConversationStore, StoreError, StoreResult};
use crate::conversation::{ConversationState, TransitionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

fn backend(context: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Backend(format!("{}: {}", context, e))
}

fn from_micros(micros: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::Serialization(format!("timestamp out of range: {}", micros)))
}

/// SQLite store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(backend("Invalid SQLite path"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(backend("Failed to connect to SQLite"))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "SQLite conversation store initialized");
        Ok(store)
    }

    /// Open the database at the default location (~/.leadflow/leadflow.db)
    pub async fn new_default() -> StoreResult<Self> {
        Self::new(Self::default_path()?).await
    }

    /// Default database path
    pub fn default_path() -> StoreResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("Could not determine home directory".to_string()))?;
        Ok(home.join(".leadflow").join("leadflow.db"))
    }

    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                current_role TEXT NOT NULL,
                status TEXT NOT NULL,
                state_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend("Failed to create conversations table"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transitions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                from_role TEXT NOT NULL,
                to_role TEXT NOT NULL,
                trigger_name TEXT NOT NULL,
                occurred_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend("Failed to create transitions table"))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transitions_conversation ON transitions(conversation_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(backend("Failed to create index"))?;

        debug!("SQLite conversation schema initialized");
        Ok(())
    }

    fn encode(state: &ConversationState) -> StoreResult<String> {
        serde_json::to_string(state).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn status_str(state: &ConversationState) -> &'static str {
        if state.is_closed() {
            "closed"
        } else {
            "open"
        }
    }

    async fn stored_version(&self, id: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT updated_at FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend("Failed to read version"))?;
        row.map(|(micros,)| from_micros(micros)).transpose()
    }

    async fn version_error(&self, id: &str, expected: DateTime<Utc>) -> StoreError {
        match self.stored_version(id).await {
            Ok(Some(actual)) => StoreError::Conflict {
                id: id.to_string(),
                expected,
                actual,
            },
            Ok(None) => StoreError::NotFound(id.to_string()),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn get_conversation_state(&self, id: &str) -> StoreResult<Option<ConversationState>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT state_json FROM conversations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend("Failed to get conversation"))?;

        row.map(|(json,)| {
            serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn create_conversation_state(&self, state: &ConversationState) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (id, current_role, status, state_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&state.id)
        .bind(state.current_role.as_str())
        .bind(Self::status_str(state))
        .bind(Self::encode(state)?)
        .bind(state.created_at.timestamp_micros())
        .bind(state.updated_at.timestamp_micros())
        .execute(&self.pool)
        .await
        .map_err(backend("Failed to create conversation"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(state.id.clone()));
        }
        debug!(conversation_id = %state.id, "Conversation created in SQLite");
        Ok(())
    }

    async fn write_conversation_state(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET current_role = ?, status = ?, state_json = ?, updated_at = ?
            WHERE id = ? AND updated_at = ?
            "#,
        )
        .bind(state.current_role.as_str())
        .bind(Self::status_str(state))
        .bind(Self::encode(state)?)
        .bind(state.updated_at.timestamp_micros())
        .bind(&state.id)
        .bind(expected_updated_at.timestamp_micros())
        .execute(&self.pool)
        .await
        .map_err(backend("Failed to write conversation"))?;

        if result.rows_affected() == 0 {
            return Err(self.version_error(&state.id, expected_updated_at).await);
        }
        Ok(())
    }

    async fn commit_transition(
        &self,
        state: &ConversationState,
        expected_updated_at: DateTime<Utc>,
        record: &TransitionRecord,
    ) -> StoreResult<()> {
        let encoded = Self::encode(state)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(backend("Failed to begin transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET current_role = ?, status = ?, state_json = ?, updated_at = ?
            WHERE id = ? AND updated_at = ?
            "#,
        )
        .bind(state.current_role.as_str())
        .bind(Self::status_str(state))
        .bind(&encoded)
        .bind(state.updated_at.timestamp_micros())
        .bind(&state.id)
        .bind(expected_updated_at.timestamp_micros())
        .execute(&mut *tx)
        .await
        .map_err(backend("Failed to update conversation"))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(backend("Failed to roll back"))?;
            return Err(self.version_error(&state.id, expected_updated_at).await);
        }

        sqlx::query(
            r#"
            INSERT INTO transitions (id, conversation_id, from_role, to_role, trigger_name, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.conversation_id)
        .bind(record.from.as_str())
        .bind(record.to.as_str())
        .bind(&record.trigger)
        .bind(record.occurred_at.timestamp_micros())
        .execute(&mut *tx)
        .await
        .map_err(backend("Failed to append transition"))?;

        tx.commit().await.map_err(backend("Failed to commit"))?;
        debug!(conversation_id = %state.id, to = %record.to, "Transition committed to SQLite");
        Ok(())
    }

    async fn transition_records(&self, id: &str) -> StoreResult<Vec<TransitionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, from_role, to_role, trigger_name, occurred_at
            FROM transitions WHERE conversation_id = ? ORDER BY seq ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend("Failed to list transitions"))?;

        rows.into_iter()
            .map(|row| {
                let decode = |e: sqlx::Error| StoreError::Serialization(e.to_string());
                let record_id: String = row.try_get("id").map_err(decode)?;
                let from: String = row.try_get("from_role").map_err(decode)?;
                let to: String = row.try_get("to_role").map_err(decode)?;
                Ok(TransitionRecord {
                    id: Uuid::parse_str(&record_id)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?,
                    conversation_id: row.try_get("conversation_id").map_err(decode)?,
                    from: from
                        .parse()
                        .map_err(|e: crate::role::RoleParseError| StoreError::Serialization(e.to_string()))?,
                    to: to
                        .parse()
                        .map_err(|e: crate::role::RoleParseError| StoreError::Serialization(e.to_string()))?,
                    trigger: row.try_get("trigger_name").map_err(decode)?,
                    occurred_at: from_micros(row.try_get("occurred_at").map_err(decode)?)?,
                })
            })
            .collect()
    }

    async fn list_conversations(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM conversations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend("Failed to list conversations"))?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
