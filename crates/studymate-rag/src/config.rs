//! Configuration for the RAG engine

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main RAG engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector index configuration
    pub index: IndexConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Answer synthesis configuration
    pub synthesis: SynthesisConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Time bounds for ingest and query
    pub timeouts: TimeoutConfig,
}

impl RagConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RagConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check that all parameters are consistent
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be greater than zero"));
        }
        if self.embeddings.max_input_words == 0 {
            return Err(Error::config("embeddings.max_input_words must be greater than zero"));
        }
        if self.retrieval.default_k == 0 {
            return Err(Error::config("retrieval.default_k must be greater than zero"));
        }
        if self.index.hnsw_m < 2 {
            return Err(Error::config("index.hnsw_m must be at least 2"));
        }
        if self.synthesis.context_budget_words == 0 {
            return Err(Error::config("synthesis.context_budget_words must be greater than zero"));
        }
        if self.synthesis.max_sentences == 0 {
            return Err(Error::config("synthesis.max_sentences must be greater than zero"));
        }

        Ok(())
    }
}

/// Word-window chunking configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in words
    pub chunk_size: usize,
    /// Words shared by consecutive windows
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

impl ChunkingConfig {
    /// Create a chunking configuration
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Require `chunk_size > chunk_overlap >= 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between consecutive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Deterministic in-process feature hashing
    #[default]
    Hashing,
    /// Ollama embeddings endpoint
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend
    pub backend: EmbeddingBackend,
    /// Ollama embedding model; unused by the hashing backend
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Longest text, in words, the model accepts
    pub max_input_words: usize,
    /// Number of chunks embedded concurrently
    pub parallel_embeddings: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashing,
            model: "all-minilm".to_string(),
            dimensions: 384,
            max_input_words: 2048,
            parallel_embeddings: 4,
        }
    }
}

impl EmbeddingConfig {
    /// Human-readable name of the embedder this configuration selects
    pub fn describe(&self) -> String {
        match self.backend {
            EmbeddingBackend::Hashing => format!("feature hashing ({} dimensions)", self.dimensions),
            EmbeddingBackend::Ollama => {
                format!("ollama {} ({} dimensions)", self.model, self.dimensions)
            }
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Vector count at which the HNSW graph is built alongside the flat index
    pub ann_threshold: usize,
    /// HNSW M parameter (connections per layer)
    pub hnsw_m: usize,
    /// HNSW ef_construction parameter
    pub hnsw_ef_construction: usize,
    /// HNSW ef_search parameter
    pub hnsw_ef_search: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ann_threshold: 20_000,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 100,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks returned when the caller does not specify k
    pub default_k: usize,
    /// Drop results scoring below this value
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 3,
            min_score: None,
        }
    }
}

/// Answer synthesis strategy, fixed when the synthesizer is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisStrategy {
    /// Verbatim spans from the retrieved chunks
    #[default]
    Extractive,
    /// Free-form answer from a language model
    Generative,
    /// Generative, with a conversational tutor prompt
    Conversational,
}

impl std::str::FromStr for SynthesisStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "extractive" => Ok(Self::Extractive),
            "generative" => Ok(Self::Generative),
            "conversational" => Ok(Self::Conversational),
            other => Err(Error::config(format!("unknown synthesis strategy '{}'", other))),
        }
    }
}

/// Answer synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Strategy
    pub strategy: SynthesisStrategy,
    /// Sentences returned by the extractive strategy
    pub max_sentences: usize,
    /// Word budget for retrieved context in generative prompts
    pub context_budget_words: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            strategy: SynthesisStrategy::Extractive,
            max_sentences: 3,
            context_budget_words: 1500,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Time bounds in seconds; `None` disables the bound
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-document extract + chunk + embed
    pub document_secs: Option<u64>,
    /// Whole `ask` call
    pub query_secs: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            document_secs: Some(300),
            query_secs: Some(120),
        }
    }
}

impl TimeoutConfig {
    pub fn document(&self) -> Option<Duration> {
        self.document_secs.map(Duration::from_secs)
    }

    pub fn query(&self) -> Option<Duration> {
        self.query_secs.map(Duration::from_secs)
    }
}
