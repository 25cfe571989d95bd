//! LLM integration crate for ragline.
//!
//! Provider-agnostic chat completion behind the [`LlmClient`] trait.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **DeepSeek**: OpenAI-compatible hosted API
//! - **Gemini**: Google generative language API
//!
//! # Example
//! ```no_run
//! use ragline_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{ChatRole, ChatTurn, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_by_name};
pub use providers::{DeepSeekClient, GeminiClient, OllamaClient};
pub use types::ProviderType;
