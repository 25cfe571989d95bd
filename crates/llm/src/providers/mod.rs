//! LLM provider implementations.

pub mod deepseek;
pub mod gemini;
pub mod ollama;

pub use deepseek::DeepSeekClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
