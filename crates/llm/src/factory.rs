//! LLM provider factory.
//!
//! Builds the client for a provider selected at configuration time. Secrets
//! are resolved by the caller and passed in; a provider that needs a key and
//! does not get one fails here rather than on its first request.

use crate::client::LlmClient;
use crate::providers::{DeepSeekClient, GeminiClient, OllamaClient};
use crate::types::ProviderType;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client for the given provider.
///
/// # Arguments
/// * `provider` - Provider variant
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required by DeepSeek and Gemini)
/// * `timeout` - Optional per-request timeout
///
/// # Errors
/// Returns `AppError::Llm` if a required API key is missing or the HTTP
/// client cannot be built.
pub fn create_client(
    provider: ProviderType,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    if provider.requires_api_key() && api_key.is_none() {
        return Err(AppError::Llm(format!(
            "{} provider requires API key",
            provider.as_str()
        )));
    }

    let http = build_http_client(timeout)?;

    match provider {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL);
            Ok(Arc::new(
                OllamaClient::with_base_url(base_url).with_http_client(http),
            ))
        }
        ProviderType::DeepSeek => {
            let endpoint = endpoint.unwrap_or(crate::providers::deepseek::DEFAULT_DEEPSEEK_URL);
            Ok(Arc::new(
                DeepSeekClient::with_endpoint(endpoint, api_key.unwrap_or_default())
                    .with_http_client(http),
            ))
        }
        ProviderType::Gemini => {
            let base_url = endpoint.unwrap_or(crate::providers::gemini::DEFAULT_GEMINI_URL);
            Ok(Arc::new(
                GeminiClient::with_base_url(base_url, api_key.unwrap_or_default())
                    .with_http_client(http),
            ))
        }
    }
}

/// Parse a provider name and create its client.
pub fn create_client_by_name(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Llm(format!("Unknown provider: {}", provider)))?;
    create_client(provider_type, endpoint, api_key, timeout)
}

fn build_http_client(timeout: Option<Duration>) -> AppResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))
}
