//! SQLite-backed history store.

use crate::{HistoryEntry, HistoryStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ragline_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::History(format!("Failed to create history directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::History(format!("Failed to open history database: {}", e)))?;

        let store = Self::with_connection(conn)?;
        tracing::debug!("Opened SQLite history at {:?}", db_path);
        Ok(store)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::History(format!("Failed to open history database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_user
                ON conversation_history(user_id, timestamp);
            "#,
        )
        .map_err(|e| AppError::History(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::History("History connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AppError::History(format!("History task failed: {}", e)))?
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn get_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<HistoryEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, query, response, timestamp
                     FROM conversation_history
                     WHERE user_id = ?1
                     ORDER BY timestamp DESC, seq DESC
                     LIMIT ?2",
                )
                .map_err(|e| AppError::History(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map(params![user_id, limit as i64], |row| {
                    let timestamp: String = row.get(4)?;
                    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                4,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?
                        .with_timezone(&Utc);

                    Ok(HistoryEntry {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        query: row.get(2)?,
                        response: row.get(3)?,
                        timestamp,
                    })
                })
                .map_err(|e| AppError::History(format!("Failed to query history: {}", e)))?;

            let mut entries = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::History(format!("Failed to read history row: {}", e)))?;

            entries.reverse();
            Ok(entries)
        })
        .await
    }

    async fn insert_history(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> AppResult<HistoryEntry> {
        let entry = HistoryEntry::new(user_id, query, response);
        let stored = entry.clone();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO conversation_history (id, user_id, query, response, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    stored.id,
                    stored.user_id,
                    stored.query,
                    stored.response,
                    stored.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .map_err(|e| AppError::History(format!("Failed to insert history: {}", e)))?;
            Ok(())
        })
        .await?;

        tracing::debug!("Stored history entry {} for user '{}'", entry.id, entry.user_id);
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();

        let stored = store.insert_history("alice", "hi", "hello").await.unwrap();
        let history = store.get_history("alice", 20).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, stored.id);
        assert_eq!(history[0].query, "hi");
        assert_eq!(history[0].response, "hello");
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent_oldest_first() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .insert_history("bob", &format!("q{}", i), &format!("a{}", i))
                .await
                .unwrap();
        }

        let history = store.get_history("bob", 3).await.unwrap();
        let queries: Vec<&str> = history.iter().map(|e| e.query.as_str()).collect();

        assert_eq!(queries, vec!["q2", "q3", "q4"]);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        store.insert_history("alice", "a", "1").await.unwrap();
        store.insert_history("bob", "b", "2").await.unwrap();

        let history = store.get_history("alice", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_id, "alice");
        assert!(store.get_history("carol", 10).await.unwrap().is_empty());
        assert!(store.get_history("alice", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("history.sqlite");

        {
            let store = SqliteHistoryStore::open(&path).unwrap();
            store.insert_history("alice", "remember me", "ok").await.unwrap();
        }

        let store = SqliteHistoryStore::open(&path).unwrap();
        let history = store.get_history("alice", 5).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "remember me");
    }
}
