//! Embedding generation
//!
//! This module provides an abstraction over embedding providers with:
//! - A trait for different embedding backends
//! - HTTP backends for the supported hosted providers
//! - Sequential batch processing with a fixed inter-batch delay

mod providers;

pub use providers::*;

use crate::config::domains::EmbeddingSettings;
use crate::config::ProviderEndpoints;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Expected embedding dimension, when known up front
    fn dimension(&self) -> Option<usize>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(
    settings: &EmbeddingSettings,
    endpoints: &ProviderEndpoints,
    timeout_secs: u64,
) -> Result<Box<dyn Embedder>> {
    let embedder = HttpEmbedder::new(settings, endpoints, timeout_secs)?;
    Ok(Box::new(embedder))
}

/// Embed sequentially in batches, sleeping between batches so hosted
/// providers are not hammered. The delay is skipped after the final batch.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
    batch_delay_ms: u64,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut all_embeddings = Vec::with_capacity(texts.len());
    let batch_count = texts.len().div_ceil(batch_size);

    for (i, chunk) in texts.chunks(batch_size).enumerate() {
        let embeddings = embedder.embed(chunk.to_vec()).await?;
        all_embeddings.extend(embeddings);

        if batch_delay_ms > 0 && i + 1 < batch_count {
            tokio::time::sleep(Duration::from_millis(batch_delay_ms)).await;
        }
    }

    Ok(all_embeddings)
}
