//! Check command handler.
//!
//! Probes each collaborator once and reports `OK` or the error it raised.
//! A failing probe never fails the command.

use crate::services;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_history::open_store;
use ragline_knowledge::{open_blob_store, GoogleSearchClient, WebSearch};
use ragline_llm::LlmRequest;
use std::collections::BTreeMap;
use std::future::Future;

/// Check that every backend is reachable
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Skip the LLM probe (it makes a billable request)
    #[arg(long)]
    pub skip_llm: bool,
}

impl CheckCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing check command");

        let mut results = BTreeMap::new();

        let (name, status) = probe("history", check_history(config)).await;
        results.insert(name, status);

        if !self.skip_llm {
            let label = format!("llm_{}", config.provider);
            let (name, status) = probe(&label, check_llm(config)).await;
            results.insert(name, status);
        }

        let (name, status) = probe("web_search", check_search(config)).await;
        results.insert(name, status);

        let (name, status) = probe("storage", check_storage(config)).await;
        results.insert(name, status);

        let (name, status) = probe("retrieval", check_retrieval(config)).await;
        results.insert(name, status);

        println!("{}", serde_json::to_string_pretty(&results)?);
        Ok(())
    }
}

async fn probe<F>(name: &str, check: F) -> (String, String)
where
    F: Future<Output = AppResult<String>>,
{
    let status = match check.await {
        Ok(detail) if detail.is_empty() => "OK".to_string(),
        Ok(detail) => format!("OK - {}", detail),
        Err(e) => {
            tracing::warn!("Check '{}' failed: {}", name, e);
            format!("Error: {}", e)
        }
    };
    (name.to_string(), status)
}

async fn check_history(config: &AppConfig) -> AppResult<String> {
    let store = open_store(config)?;
    store.get_history("ADMIN", 1).await?;
    Ok(String::new())
}

async fn check_llm(config: &AppConfig) -> AppResult<String> {
    let client = services::llm_client(config)?;
    let model = services::active_model(config)?;
    let response = client.complete(&LlmRequest::new("Test query", model)).await?;
    Ok(format!("Response: {}", response.content.trim()))
}

async fn check_search(config: &AppConfig) -> AppResult<String> {
    match GoogleSearchClient::from_config(config)? {
        Some(client) => {
            client.search("Test query").await?;
            Ok(String::new())
        }
        None => Ok("disabled".to_string()),
    }
}

async fn check_storage(config: &AppConfig) -> AppResult<String> {
    config.ensure_state_dir()?;
    let probe_file = config.state_dir().join("check.txt");
    tokio::fs::write(&probe_file, b"ragline storage check").await?;

    let store = open_blob_store(config)?;
    let result = store.upload(&probe_file, "check.txt").await;
    tokio::fs::remove_file(&probe_file).await.ok();
    result?;

    Ok(String::new())
}

async fn check_retrieval(config: &AppConfig) -> AppResult<String> {
    let engine = services::retrieval_engine(config).await?;
    let documents = vec!["Test document".to_string()];
    engine.retrieve_relevant(&documents, "Test query", 1).await?;

    let embedder = engine.embedder();
    Ok(format!(
        "{} {} ({} dims)",
        embedder.provider_name(),
        embedder.model_name(),
        embedder.dimensions()
    ))
}
