//! Query command handler.
//!
//! Runs the full request flow: load the user's history, build external
//! context from stored documents and web search, call the LLM and record
//! the turn.

use crate::services;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_history::{open_store, HistoryEntry};
use ragline_knowledge::render_prompt;
use ragline_llm::{ChatTurn, LlmRequest, LlmResponse};

/// Answer a query with history and document context
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// The user's query
    pub query: String,

    /// User id for history tracking
    #[arg(short, long)]
    pub user: String,

    /// Maximum history entries to load (default: history.maxHistory)
    #[arg(long)]
    pub history: Option<usize>,

    /// Stored document to use as context (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<String>,

    /// Maximum tokens in response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature for response generation
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    /// Execute the query command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command for user '{}'", self.user);
        tracing::debug!("Query command options: {:?}", self);

        config.validate()?;

        let store = open_store(config)?;
        let limit = self.history.unwrap_or(config.history.max_history);
        let history = store.get_history(&self.user, limit).await?;
        tracing::debug!("Loaded {} history entries", history.len());

        let context = if self.files.is_empty() {
            String::new()
        } else {
            tracing::info!("Building context from {} documents", self.files.len());
            let assembler = services::context_assembler(config).await?;
            assembler.external_context(&self.query, &self.files).await?
        };

        let prompt = render_prompt(
            config.retrieval.prompt_template.as_deref(),
            &self.query,
            &context,
        )?;

        let client = services::llm_client(config)?;
        let model = services::active_model(config)?;

        let mut request = LlmRequest::new(prompt, model).with_history(history_turns(&history));
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        tracing::info!("Sending request to {}", client.provider_name());
        let response = client.complete(&request).await?;

        store
            .insert_history(&self.user, &self.query, &response.content)
            .await?;

        if self.json {
            let output = response_json(&self.user, &response);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", response.content);
            tracing::debug!(
                "Token usage - Prompt: {}, Completion: {}, Total: {}",
                response.usage.prompt_tokens,
                response.usage.completion_tokens,
                response.usage.total_tokens
            );
        }

        Ok(())
    }
}

/// Stored entries as alternating user/assistant turns.
fn history_turns(history: &[HistoryEntry]) -> Vec<ChatTurn> {
    history
        .iter()
        .flat_map(|entry| {
            [
                ChatTurn::user(entry.query.clone()),
                ChatTurn::assistant(entry.response.clone()),
            ]
        })
        .collect()
}

fn response_json(user_id: &str, response: &LlmResponse) -> serde_json::Value {
    serde_json::json!({
        "user_id": user_id,
        "response_status": "success",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "response": {
            "answer": response.content,
            "model": response.model,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_llm::{ChatRole, LlmUsage};

    #[test]
    fn test_history_turns_alternate() {
        let history = vec![
            HistoryEntry::new("u", "q1", "a1"),
            HistoryEntry::new("u", "q2", "a2"),
        ];

        let turns = history_turns(&history);

        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[0].content, "q1");
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[3].content, "a2");
    }

    #[test]
    fn test_response_json_shape() {
        let response = LlmResponse {
            content: "Cats are mammals.".to_string(),
            model: "llama3.2".to_string(),
            usage: LlmUsage::new(10, 5),
        };

        let json = response_json("alice", &response);

        assert_eq!(json["user_id"], "alice");
        assert_eq!(json["response_status"], "success");
        assert_eq!(json["response"]["answer"], "Cats are mammals.");
        assert!(json["timestamp"].is_string());
    }
}
