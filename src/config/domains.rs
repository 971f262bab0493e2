//! Typed configuration domains stored in the key/value config store.
//!
//! Each named domain (`chunking`, `embedding`, `chat`) maps to a concrete
//! settings struct. Values are validated when written; the store never holds
//! an opaque blob. Provider API keys are referenced by environment variable
//! name and never stored.

use crate::chunk::ChunkStrategy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key for the chunking domain
pub const CHUNKING_KEY: &str = "chunking";
/// Key for the embedding domain
pub const EMBEDDING_KEY: &str = "embedding";
/// Key for the chat/search domain
pub const CHAT_KEY: &str = "chat";

/// All recognized configuration keys
pub const KNOWN_KEYS: &[&str] = &[CHUNKING_KEY, EMBEDDING_KEY, CHAT_KEY];

/// Embedding provider selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Cohere,
    HuggingFace,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Cohere => write!(f, "cohere"),
            ProviderKind::HuggingFace => write!(f, "huggingface"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "cohere" => Ok(ProviderKind::Cohere),
            "huggingface" => Ok(ProviderKind::HuggingFace),
            _ => Err(Error::Config(format!("Unknown embedding provider: {}", s))),
        }
    }
}

/// Chunking settings (`chunking` key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    #[serde(default)]
    pub strategy: ChunkStrategy,

    /// Target characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters carried over between adjacent chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::Config(
                "chunking.overlap must be smaller than chunking.chunk_size".to_string(),
            ));
        }
        Ok(())
    }
}

/// Embedding settings (`embedding` key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector dimension; None accepts whatever the provider returns
    #[serde(default)]
    pub dimension: Option<usize>,

    /// Cosine-similarity floor recorded with each generated embedding
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Chunks per provider request
    #[serde(default = "default_embed_batch_size")]
    pub batch_size: usize,

    /// Fixed delay between batches, to stay under provider rate limits
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Environment variable holding the provider API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider() -> ProviderKind {
    ProviderKind::OpenAi
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_embed_batch_size() -> usize {
    16
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dimension: None,
            similarity_threshold: default_similarity_threshold(),
            batch_size: default_embed_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl EmbeddingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("embedding.model must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Config(
                "embedding.similarity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be at least 1".to_string()));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(Error::Config(
                "embedding.api_key_env must name an environment variable".to_string(),
            ));
        }
        Ok(())
    }

    /// Read the provider API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            Error::Config(format!(
                "Environment variable {} is not set (required for provider '{}')",
                self.api_key_env, self.provider
            ))
        })
    }
}

/// Chat/search settings (`chat` key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retrieved chunks injected into the chat context
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,

    /// Cosine-similarity floor applied when retrieving chunks
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_context_chunks() -> usize {
    5
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            temperature: default_temperature(),
            max_context_chunks: default_max_context_chunks(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl ChatSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(
                "chat.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Config(
                "chat.similarity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.max_context_chunks == 0 {
            return Err(Error::Config(
                "chat.max_context_chunks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A validated configuration domain value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigDomain {
    Chunking(ChunkingSettings),
    Embedding(EmbeddingSettings),
    Chat(ChatSettings),
}

impl ConfigDomain {
    /// The store key for this domain
    pub fn key(&self) -> &'static str {
        match self {
            ConfigDomain::Chunking(_) => CHUNKING_KEY,
            ConfigDomain::Embedding(_) => EMBEDDING_KEY,
            ConfigDomain::Chat(_) => CHAT_KEY,
        }
    }

    /// Parse and validate a raw JSON value for the given key
    pub fn from_key_value(key: &str, value: serde_json::Value) -> Result<Self> {
        let domain = match key {
            CHUNKING_KEY => ConfigDomain::Chunking(serde_json::from_value(value)?),
            EMBEDDING_KEY => ConfigDomain::Embedding(serde_json::from_value(value)?),
            CHAT_KEY => ConfigDomain::Chat(serde_json::from_value(value)?),
            other => {
                return Err(Error::Config(format!(
                    "Unknown configuration key '{}' (expected one of: {})",
                    other,
                    KNOWN_KEYS.join(", ")
                )))
            }
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Default value for a known key
    pub fn default_for_key(key: &str) -> Result<Self> {
        match key {
            CHUNKING_KEY => Ok(ConfigDomain::Chunking(ChunkingSettings::default())),
            EMBEDDING_KEY => Ok(ConfigDomain::Embedding(EmbeddingSettings::default())),
            CHAT_KEY => Ok(ConfigDomain::Chat(ChatSettings::default())),
            other => Err(Error::Config(format!(
                "Unknown configuration key '{}'",
                other
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ConfigDomain::Chunking(s) => s.validate(),
            ConfigDomain::Embedding(s) => s.validate(),
            ConfigDomain::Chat(s) => s.validate(),
        }
    }

    /// Serialize back to the JSON stored in the config table
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(match self {
            ConfigDomain::Chunking(s) => serde_json::to_value(s)?,
            ConfigDomain::Embedding(s) => serde_json::to_value(s)?,
            ConfigDomain::Chat(s) => serde_json::to_value(s)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_key_rejected() {
        let err = ConfigDomain::from_key_value("widgets", json!({})).unwrap_err();
        assert!(err.to_string().contains("widgets"));
    }

    #[test]
    fn test_chunking_roundtrip() {
        let value = json!({"strategy": "recursive", "chunk_size": 800, "overlap": 100});
        let domain = ConfigDomain::from_key_value(CHUNKING_KEY, value).unwrap();
        match &domain {
            ConfigDomain::Chunking(s) => {
                assert_eq!(s.strategy, ChunkStrategy::Recursive);
                assert_eq!(s.chunk_size, 800);
            }
            _ => panic!("wrong domain"),
        }
    }

    #[test]
    fn test_chunking_overlap_must_be_smaller() {
        let value = json!({"chunk_size": 100, "overlap": 100});
        assert!(ConfigDomain::from_key_value(CHUNKING_KEY, value).is_err());
    }

    #[test]
    fn test_embedding_defaults_fill_in() {
        let domain = ConfigDomain::from_key_value(EMBEDDING_KEY, json!({})).unwrap();
        match domain {
            ConfigDomain::Embedding(s) => {
                assert_eq!(s.provider, ProviderKind::OpenAi);
                assert_eq!(s.batch_size, 16);
            }
            _ => panic!("wrong domain"),
        }
    }

    #[test]
    fn test_embedding_threshold_bounds() {
        let value = json!({"similarity_threshold": 1.5});
        assert!(ConfigDomain::from_key_value(EMBEDDING_KEY, value).is_err());
    }

    #[test]
    fn test_chat_temperature_bounds() {
        let value = json!({"temperature": 3.0});
        assert!(ConfigDomain::from_key_value(CHAT_KEY, value).is_err());
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            "huggingface".parse::<ProviderKind>().unwrap(),
            ProviderKind::HuggingFace
        );
        assert!("azure".parse::<ProviderKind>().is_err());
    }
}
