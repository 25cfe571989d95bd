//! Context assembly: turns stored documents and web results into the text
//! appended to a user's prompt.

use crate::parser;
use crate::retrieval::{RetrievalEngine, DEFAULT_TOP_K};
use crate::search::WebSearch;
use crate::storage::BlobStore;
use handlebars::Handlebars;
use ragline_core::config::{DegradationPolicy, RetrievalSettings};
use ragline_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Template used when none is configured.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "{{query}}\n\nContext:\n{{context}}";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Builds external context for a query from named blobs and web search.
pub struct ContextAssembler {
    engine: Arc<RetrievalEngine>,
    blobs: Arc<dyn BlobStore>,
    search: Option<Arc<dyn WebSearch>>,
    top_k: usize,
    timeout: Duration,
    policy: DegradationPolicy,
}

impl ContextAssembler {
    pub fn new(engine: Arc<RetrievalEngine>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            engine,
            blobs,
            search: None,
            top_k: DEFAULT_TOP_K,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            policy: DegradationPolicy::Abort,
        }
    }

    /// Apply `top_k`, timeout and degradation policy from configuration.
    pub fn with_settings(mut self, settings: &RetrievalSettings) -> Self {
        self.top_k = settings.top_k;
        self.timeout = Duration::from_secs(settings.timeout_secs);
        self.policy = settings.degradation;
        self
    }

    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: DegradationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load the named blobs and return the ones most relevant to `query`.
    pub async fn relevant_documents(
        &self,
        query: &str,
        file_names: &[String],
    ) -> AppResult<Vec<String>> {
        let reads = file_names.iter().map(|name| async move {
            let bytes = self.blobs.read(name).await?;
            parser::extract_text(name, &bytes)
        });
        let documents = futures::future::try_join_all(reads).await?;

        tracing::info!(
            "Selecting up to {} of {} documents for query",
            self.top_k,
            documents.len()
        );

        let retrieval = self.engine.retrieve_relevant(&documents, query, self.top_k);
        match tokio::time::timeout(self.timeout, retrieval).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Knowledge(format!(
                "Retrieval timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Full external context: relevant documents, then web search results
    /// when a search backend is attached. Empty when neither part contributes.
    pub async fn external_context(&self, query: &str, file_names: &[String]) -> AppResult<String> {
        let documents = match self.relevant_documents(query, file_names).await {
            Ok(documents) => documents,
            Err(e) => self.degrade("document retrieval", e)?,
        };

        let summary = match &self.search {
            Some(search) => match search.search(query).await {
                Ok(summary) => summary,
                Err(e) => self.degrade("web search", e)?,
            },
            None => String::new(),
        };

        let mut context = String::new();
        if !documents.is_empty() {
            context.push_str("Relevant Documents:\n");
            context.push_str(&documents.join("\n"));
        }
        if !summary.is_empty() {
            if !context.is_empty() {
                context.push_str("\n\n");
            }
            context.push_str(&summary);
        }

        Ok(context)
    }

    fn degrade<T: Default>(&self, stage: &str, err: AppError) -> AppResult<T> {
        match self.policy {
            DegradationPolicy::Abort => Err(err),
            DegradationPolicy::Degrade => {
                tracing::warn!("Continuing without {}: {}", stage, err);
                Ok(T::default())
            }
        }
    }
}

/// Render the final prompt sent to the LLM.
///
/// An empty context yields the bare query.
pub fn render_prompt(template: Option<&str>, query: &str, context: &str) -> AppResult<String> {
    if context.is_empty() {
        return Ok(query.to_string());
    }

    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template.unwrap_or(DEFAULT_PROMPT_TEMPLATE))
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let data = serde_json::json!({
        "query": query,
        "context": context,
    });

    handlebars
        .render("prompt", &data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Embedder, EmbeddingProvider};
    use crate::storage::LocalBlobStore;
    use async_trait::async_trait;
    use ragline_core::config::EmbeddingSettings;
    use tempfile::TempDir;

    struct FixedSearch(AppResult<String>);

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, _query: &str) -> AppResult<String> {
            match &self.0 {
                Ok(summary) => Ok(summary.clone()),
                Err(e) => Err(AppError::Search(e.to_string())),
            }
        }
    }

    async fn assembler(temp: &TempDir) -> ContextAssembler {
        let store = LocalBlobStore::new(temp.path());
        for (name, text) in [
            ("cat.txt", "The cat sat on the mat."),
            ("stocks.txt", "Stock markets rose today."),
            ("mammals.md", "# Cats are small mammals."),
        ] {
            std::fs::write(temp.path().join(name), text).unwrap();
        }

        let embedder = Embedder::load(&EmbeddingSettings::default()).await.unwrap();
        let engine = Arc::new(RetrievalEngine::new(Arc::new(embedder)));
        ContextAssembler::new(engine, Arc::new(store))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_relevant_documents_from_blobs() {
        let temp = TempDir::new().unwrap();
        let assembler = assembler(&temp).await.with_top_k(2);

        let docs = assembler
            .relevant_documents("Tell me about cats", &names(&["cat.txt", "stocks.txt", "mammals.md"]))
            .await
            .unwrap();

        assert_eq!(
            docs,
            vec!["Cats are small mammals.".to_string(), "The cat sat on the mat.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_external_context_with_search() {
        let temp = TempDir::new().unwrap();
        let search = FixedSearch(Ok("Google Search Results:\n- Cat: Felis catus\n".to_string()));
        let assembler = assembler(&temp)
            .await
            .with_top_k(1)
            .with_search(Arc::new(search));

        let context = assembler
            .external_context("stock markets", &names(&["cat.txt", "stocks.txt"]))
            .await
            .unwrap();

        assert_eq!(
            context,
            "Relevant Documents:\nStock markets rose today.\n\nGoogle Search Results:\n- Cat: Felis catus\n"
        );
    }

    #[tokio::test]
    async fn test_external_context_without_search() {
        let temp = TempDir::new().unwrap();
        let assembler = assembler(&temp).await.with_top_k(1);

        let context = assembler
            .external_context("stock markets", &names(&["stocks.txt"]))
            .await
            .unwrap();

        assert_eq!(context, "Relevant Documents:\nStock markets rose today.");
    }

    #[tokio::test]
    async fn test_abort_policy_propagates_missing_blob() {
        let temp = TempDir::new().unwrap();
        let assembler = assembler(&temp).await;

        let result = assembler
            .external_context("cats", &names(&["missing.pdf"]))
            .await;

        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_degrade_policy_skips_failures() {
        let temp = TempDir::new().unwrap();
        let search = FixedSearch(Err(AppError::Search("quota".to_string())));
        let assembler = assembler(&temp)
            .await
            .with_policy(DegradationPolicy::Degrade)
            .with_search(Arc::new(search));

        let context = assembler
            .external_context("cats", &names(&["missing.pdf"]))
            .await
            .unwrap();

        assert_eq!(context, "");
        assert_eq!(render_prompt(None, "cats", &context).unwrap(), "cats");
    }

    #[tokio::test]
    async fn test_degraded_retrieval_keeps_search_results() {
        let temp = TempDir::new().unwrap();
        let search = FixedSearch(Ok("Google Search Results:\n- Cat: Felis catus\n".to_string()));
        let assembler = assembler(&temp)
            .await
            .with_policy(DegradationPolicy::Degrade)
            .with_search(Arc::new(search));

        let context = assembler
            .external_context("cats", &names(&["missing.pdf"]))
            .await
            .unwrap();

        assert_eq!(context, "Google Search Results:\n- Cat: Felis catus\n");
    }

    /// Answers after a delay far longer than the assembler's timeout.
    #[derive(Debug)]
    struct SlowProvider;

    #[async_trait]
    impl EmbeddingProvider for SlowProvider {
        fn provider_name(&self) -> &str {
            "slow"
        }

        fn model_name(&self) -> &str {
            "slow"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(texts.iter().map(|_| vec![0.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_retrieval_timeout() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("cat.txt"), "The cat sat on the mat.").unwrap();

        let embedder = Embedder::from_provider(Arc::new(SlowProvider));
        let engine = Arc::new(RetrievalEngine::new(Arc::new(embedder)));
        let assembler = ContextAssembler::new(engine, Arc::new(LocalBlobStore::new(temp.path())))
            .with_timeout(Duration::from_millis(1));

        let result = assembler
            .relevant_documents("cats", &names(&["cat.txt"]))
            .await;

        match result {
            Err(AppError::Knowledge(message)) => assert!(message.contains("timed out"), "{}", message),
            other => panic!("expected timeout, got {:?}", other),
        }

        let degraded = assembler
            .with_policy(DegradationPolicy::Degrade)
            .external_context("cats", &names(&["cat.txt"]))
            .await
            .unwrap();
        assert_eq!(degraded, "");
    }

    #[tokio::test]
    async fn test_abort_policy_propagates_search_error() {
        let temp = TempDir::new().unwrap();
        let search = FixedSearch(Err(AppError::Search("quota".to_string())));
        let assembler = assembler(&temp).await.with_search(Arc::new(search));

        let result = assembler.external_context("cats", &names(&["cat.txt"])).await;
        assert!(matches!(result, Err(AppError::Search(_))));
    }

    #[test]
    fn test_render_prompt_default_template() {
        let prompt = render_prompt(None, "What is <Rust>?", "Relevant Documents:\nA & B").unwrap();
        assert_eq!(prompt, "What is <Rust>?\n\nContext:\nRelevant Documents:\nA & B");
    }

    #[test]
    fn test_render_prompt_empty_context_is_bare_query() {
        assert_eq!(render_prompt(None, "hello", "").unwrap(), "hello");
    }

    #[test]
    fn test_render_prompt_custom_template() {
        let prompt = render_prompt(Some("Q: {{query}} | C: {{context}}"), "a", "b").unwrap();
        assert_eq!(prompt, "Q: a | C: b");

        assert!(matches!(
            render_prompt(Some("{{#if}}"), "a", "b"),
            Err(AppError::Prompt(_))
        ));
    }
}
