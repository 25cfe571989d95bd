//! Text embedding.
//!
//! [`Embedder`] wraps a loaded [`EmbeddingProvider`] and enforces the
//! embedding contract: one vector per input text, in input order, each of
//! the configured dimension.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use crate::error::{RetrievalError, RetrievalResult};
use ragline_core::config::EmbeddingSettings;
use std::sync::Arc;

/// Loaded embedding model.
///
/// Construct one per process and share it behind an `Arc`; the provider is
/// read-only after loading.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    /// Load the configured provider.
    pub async fn load(settings: &EmbeddingSettings) -> RetrievalResult<Self> {
        tracing::info!(
            "Loading embedding model: provider={}, model={}, dimensions={}",
            settings.provider.as_str(),
            settings.model,
            settings.dimensions
        );

        let provider = create_provider(settings)
            .await
            .map_err(|e| RetrievalError::ModelLoad(e.to_string()))?;

        Ok(Self { provider })
    }

    /// Wrap an already constructed provider.
    pub fn from_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed a batch of texts. An empty batch never reaches the provider.
    pub async fn embed(&self, texts: &[String]) -> RetrievalResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Embedding {} texts with provider '{}' (model: {})",
            texts.len(),
            self.provider_name(),
            self.model_name()
        );

        let embeddings = self
            .provider
            .embed_batch(texts)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "Provider returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        let expected = self.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(RetrievalError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        Ok(embeddings)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        let mut embeddings = self.embed(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("No embedding returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::config::EmbeddingProviderKind;
    use ragline_core::AppResult;

    /// Provider that returns vectors of a fixed, possibly wrong, length.
    #[derive(Debug)]
    struct FixedProvider {
        declared: usize,
        produced: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimensions(&self) -> usize {
            self.declared
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32; self.produced])
                .collect())
        }
    }

    #[tokio::test]
    async fn test_load_trigram() {
        let embedder = Embedder::load(&EmbeddingSettings::default()).await.unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.provider_name(), "trigram");
    }

    #[tokio::test]
    async fn test_load_failure_is_model_load() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProviderKind::Ollama,
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: Some("http://127.0.0.1:1".to_string()),
        };

        let err = Embedder::load(&settings).await.unwrap_err();
        assert!(matches!(err, RetrievalError::ModelLoad(_)));
    }

    #[tokio::test]
    async fn test_embed_preserves_order() {
        let embedder = Embedder::load(&EmbeddingSettings::default()).await.unwrap();
        let texts = vec![
            "alpha document".to_string(),
            "beta document".to_string(),
            "gamma document".to_string(),
        ];

        let batch = embedder.embed(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&embedder.embed_one(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let embedder = Embedder::load(&EmbeddingSettings::default()).await.unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimension_from_provider() {
        let embedder = Embedder::from_provider(Arc::new(FixedProvider {
            declared: 4,
            produced: 3,
        }));

        let err = embedder.embed(&["text".to_string()]).await.unwrap_err();
        assert_eq!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        );
    }
}
