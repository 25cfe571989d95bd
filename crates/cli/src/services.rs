//! Construction of the collaborators commands share.

use ragline_core::{AppConfig, AppError, AppResult};
use ragline_knowledge::{
    open_blob_store, ContextAssembler, GoogleSearchClient, RetrievalEngine, WebSearch,
};
use ragline_llm::{create_client_by_name, LlmClient};
use std::sync::Arc;
use std::time::Duration;

/// LLM client for the active provider.
pub fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.and_then(|pc| pc.endpoint.as_deref());
    let timeout = provider_config
        .and_then(|pc| pc.timeout)
        .map(Duration::from_secs);
    let api_key = config.resolve_api_key(&config.provider);

    create_client_by_name(&config.provider, endpoint, api_key.as_deref(), timeout)
}

/// Model for the active provider.
pub fn active_model(config: &AppConfig) -> AppResult<String> {
    config.active_model().ok_or_else(|| {
        AppError::Config(format!("No model configured for provider '{}'", config.provider))
    })
}

/// Load the embedding model and build the retrieval engine.
pub async fn retrieval_engine(config: &AppConfig) -> AppResult<Arc<RetrievalEngine>> {
    let engine = RetrievalEngine::from_settings(&config.embedding, &config.retrieval).await?;
    Ok(Arc::new(engine))
}

/// Web search client, or `None` when search is disabled.
pub fn web_search(config: &AppConfig) -> AppResult<Option<Arc<dyn WebSearch>>> {
    let client = GoogleSearchClient::from_config(config)?;
    Ok(client.map(|client| Arc::new(client) as Arc<dyn WebSearch>))
}

/// Context assembler wired to the configured storage and search backends.
pub async fn context_assembler(config: &AppConfig) -> AppResult<ContextAssembler> {
    let engine = retrieval_engine(config).await?;
    let blobs = open_blob_store(config)?;

    let mut assembler = ContextAssembler::new(engine, blobs).with_settings(&config.retrieval);
    if let Some(search) = web_search(config)? {
        assembler = assembler.with_search(search);
    }

    Ok(assembler)
}
