//! Document retrieval over an in-memory vector index.
//!
//! A call embeds the document batch, indexes it, embeds the query and maps
//! the nearest positions back to document text. Built indexes can be kept in
//! a bounded cache keyed by the ordered document set, so repeated queries
//! over the same documents only embed the query.

use crate::embeddings::Embedder;
use crate::error::{RetrievalError, RetrievalResult};
use crate::vector_index::{FlatL2Index, VectorIndex};
use ragline_core::config::{EmbeddingSettings, RetrievalSettings};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

/// Number of documents returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 3;

/// A retrieved document with its rank data.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    /// Position of the document in the input batch
    pub position: usize,

    /// Squared L2 distance between document and query embeddings
    pub distance: f32,

    pub text: String,
}

#[derive(Debug, Default)]
struct IndexCache {
    entries: HashMap<String, Arc<FlatL2Index>>,
    order: VecDeque<String>,
}

/// Retrieval engine: ingests a corpus and answers nearest-document queries.
#[derive(Debug)]
pub struct RetrievalEngine {
    embedder: Arc<Embedder>,
    cache_capacity: usize,
    cache: RwLock<IndexCache>,
}

impl RetrievalEngine {
    /// Create an engine without an index cache.
    pub fn new(embedder: Arc<Embedder>) -> Self {
        Self {
            embedder,
            cache_capacity: 0,
            cache: RwLock::new(IndexCache::default()),
        }
    }

    /// Keep up to `capacity` built indexes; 0 disables caching.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Load the embedding model and size the cache from configuration.
    pub async fn from_settings(
        embedding: &EmbeddingSettings,
        retrieval: &RetrievalSettings,
    ) -> RetrievalResult<Self> {
        let embedder = Embedder::load(embedding).await?;
        Ok(Self::new(Arc::new(embedder)).with_cache_capacity(retrieval.index_cache_capacity))
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Return up to `k` documents most relevant to `query`, best first.
    pub async fn retrieve_relevant(
        &self,
        documents: &[String],
        query: &str,
        k: usize,
    ) -> RetrievalResult<Vec<String>> {
        Ok(self
            .retrieve_ranked(documents, query, k)
            .await?
            .into_iter()
            .map(|doc| doc.text)
            .collect())
    }

    /// Like [`retrieve_relevant`](Self::retrieve_relevant), keeping positions
    /// and distances.
    pub async fn retrieve_ranked(
        &self,
        documents: &[String],
        query: &str,
        k: usize,
    ) -> RetrievalResult<Vec<RankedDocument>> {
        if k == 0 {
            return Err(RetrievalError::InvalidK);
        }
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index_for(documents).await?;
        let query_vector = self.embedder.embed_one(query).await?;
        let hits = index.search(&query_vector, k)?;

        tracing::debug!(
            "Retrieved {} of {} documents (best distance: {:?})",
            hits.len(),
            documents.len(),
            hits.first().map(|h| h.distance)
        );

        Ok(hits
            .into_iter()
            .map(|hit| RankedDocument {
                position: hit.position,
                distance: hit.distance,
                text: documents[hit.position].clone(),
            })
            .collect())
    }

    /// Drop every cached index.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.entries.clear();
        cache.order.clear();
    }

    /// Number of indexes currently cached.
    pub fn cached_indexes(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    async fn index_for(&self, documents: &[String]) -> RetrievalResult<Arc<FlatL2Index>> {
        if self.cache_capacity == 0 {
            return Ok(Arc::new(self.build_index(documents).await?));
        }

        let key = self.cache_key(documents);
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(index) = cache.entries.get(&key) {
                tracing::debug!("Index cache hit for {} documents", documents.len());
                return Ok(Arc::clone(index));
            }
        }

        let index = Arc::new(self.build_index(documents).await?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if !cache.entries.contains_key(&key) {
            while cache.order.len() >= self.cache_capacity {
                match cache.order.pop_front() {
                    Some(oldest) => {
                        cache.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            cache.order.push_back(key.clone());
            cache.entries.insert(key, Arc::clone(&index));
        }

        Ok(index)
    }

    async fn build_index(&self, documents: &[String]) -> RetrievalResult<FlatL2Index> {
        let vectors = self.embedder.embed(documents).await?;
        let mut index = FlatL2Index::new(self.embedder.dimensions())?;
        index.add(vectors)?;

        tracing::info!(
            "Built index over {} documents (dimension {})",
            index.len(),
            index.dimension()
        );

        Ok(index)
    }

    /// SHA-256 over the embedding model identity and the ordered, length
    /// prefixed documents.
    fn cache_key(&self, documents: &[String]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.embedder.provider_name().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.embedder.model_name().as_bytes());
        hasher.update([0u8]);
        hasher.update((self.embedder.dimensions() as u64).to_le_bytes());
        for doc in documents {
            hasher.update((doc.len() as u64).to_le_bytes());
            hasher.update(doc.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
