//! Provider abstractions for embeddings and answer generation
//!
//! The engine only talks to models through these traits, so local and remote
//! backends (and test doubles) are interchangeable.

pub mod credentials;
pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod ollama;

pub use credentials::ApiToken;
pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
