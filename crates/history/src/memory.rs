//! In-process history store; contents are lost when the process exits.

use crate::{HistoryEntry, HistoryStore};
use async_trait::async_trait;
use ragline_core::AppResult;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn get_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<HistoryEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let Some(user_entries) = entries.get(user_id) else {
            return Ok(Vec::new());
        };

        let start = user_entries.len().saturating_sub(limit);
        Ok(user_entries[start..].to_vec())
    }

    async fn insert_history(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> AppResult<HistoryEntry> {
        let entry = HistoryEntry::new(user_id, query, response);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }
}
