//! Conversation history persistence.
//!
//! Each completed request stores one [`HistoryEntry`] (the user's query and
//! the model's answer). Entries are loaded back per user to give the LLM the
//! recent conversation.

pub mod entry;
pub mod memory;
pub mod sqlite;

pub use entry::HistoryEntry;
pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

use async_trait::async_trait;
use ragline_core::config::HistoryBackend;
use ragline_core::{AppConfig, AppResult};
use std::sync::Arc;

/// Storage for conversation turns.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    fn backend_name(&self) -> &str;

    /// The `limit` most recent entries for `user_id`, oldest first.
    async fn get_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<HistoryEntry>>;

    /// Record a completed turn and return the stored entry.
    async fn insert_history(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> AppResult<HistoryEntry>;
}

/// Open the configured history backend.
pub fn open_store(config: &AppConfig) -> AppResult<Arc<dyn HistoryStore>> {
    match config.history.backend {
        HistoryBackend::Sqlite => {
            let store = SqliteHistoryStore::open(&config.history_path())?;
            Ok(Arc::new(store))
        }
        HistoryBackend::Memory => Ok(Arc::new(MemoryHistoryStore::new())),
    }
}
