//! Web search used as extra prompt context.

use async_trait::async_trait;
use ragline_core::{AppConfig, AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A web search backend producing a plain-text summary of results.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> AppResult<String>;
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Render results as a `Google Search Results:` block, one `- title: snippet`
/// line per item.
pub fn format_results(items: &[SearchItem]) -> String {
    let mut summary = String::from("Google Search Results:\n");
    for item in items {
        summary.push_str(&format!("- {}: {}\n", item.title, item.snippet));
    }
    summary
}

/// Google Custom Search JSON API client.
#[derive(Debug, Clone)]
pub struct GoogleSearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
}

impl GoogleSearchClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Build the client from configuration.
    ///
    /// Returns `None` when search is disabled. Enabled search without
    /// credentials in the environment is a configuration error.
    pub fn from_config(config: &AppConfig) -> AppResult<Option<Self>> {
        if !config.search.enabled {
            return Ok(None);
        }

        let (api_key, engine_id) = config.resolve_search_credentials().ok_or_else(|| {
            AppError::Config(format!(
                "Web search is enabled but {} and {} are not both set",
                config.search.api_key_env, config.search.engine_id_env
            ))
        })?;

        Ok(Some(Self::new(&config.search.endpoint, api_key, engine_id)))
    }
}

#[async_trait]
impl WebSearch for GoogleSearchClient {
    async fn search(&self, query: &str) -> AppResult<String> {
        tracing::debug!("Searching the web for: {}", query);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Google Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Google Search API Error: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let results: SearchResponse = response.json().await.map_err(|e| {
            AppError::Search(format!("Failed to parse Google Search response: {}", e))
        })?;

        tracing::debug!("Web search returned {} items", results.items.len());
        Ok(format_results(&results.items))
    }
}
