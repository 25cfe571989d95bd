//! Document retrieval for ragline.
//!
//! The core is an embedding-indexed retrieval engine: documents are embedded
//! into fixed-dimension vectors, stored in an exact L2 index, and the
//! documents nearest to a query embedding are returned. Around it sit the
//! pieces that feed it and consume it: text extraction, blob storage, web
//! search and context assembly.

pub mod context;
pub mod embeddings;
pub mod error;
pub mod parser;
pub mod retrieval;
pub mod search;
pub mod storage;
pub mod vector_index;


pub use context::{render_prompt, ContextAssembler, DEFAULT_PROMPT_TEMPLATE};
pub use embeddings::{Embedder, EmbeddingProvider};
pub use error::{RetrievalError, RetrievalResult};
pub use retrieval::{RankedDocument, RetrievalEngine, DEFAULT_TOP_K};
pub use search::{GoogleSearchClient, WebSearch};
pub use storage::{open_blob_store, BlobStore, LocalBlobStore};
pub use vector_index::{FlatL2Index, SearchHit, VectorIndex};
