use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry id (UUID v4)
    pub id: String,

    pub user_id: String,

    /// The user's query as submitted, without retrieved context
    pub query: String,

    /// The model's answer
    pub response: String,

    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        query: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}
