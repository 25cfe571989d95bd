//! Embedding provider trait and factory.

use super::providers::{ollama::OllamaProvider, trigram::TrigramProvider};
use ragline_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be safe to call concurrently; the loaded model is
/// shared read-only across in-flight requests.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create and load an embedding provider.
///
/// Server-backed providers verify that the model answers with the configured
/// dimension before this returns.
pub async fn create_provider(
    settings: &EmbeddingSettings,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if settings.dimensions == 0 {
        return Err(AppError::Knowledge(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match settings.provider {
        EmbeddingProviderKind::Trigram => {
            Ok(Arc::new(TrigramProvider::new(settings.dimensions)))
        }
        EmbeddingProviderKind::Ollama => {
            let provider = OllamaProvider::new(settings).await?;
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_trigram_provider() {
        let settings = EmbeddingSettings::default();

        let provider = create_provider(&settings).await.unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn test_zero_dimensions_rejected() {
        let settings = EmbeddingSettings {
            dimensions: 0,
            ..EmbeddingSettings::default()
        };

        let result = create_provider(&settings).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingSettings::default()).await.unwrap();

        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
