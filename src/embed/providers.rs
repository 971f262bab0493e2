//! HTTP embedding backends for hosted providers

use super::Embedder;
use crate::config::domains::{EmbeddingSettings, ProviderKind};
use crate::config::ProviderEndpoints;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Embedder that calls a hosted provider over HTTP. The request and response
/// shapes differ per provider; everything else is shared.
pub struct HttpEmbedder {
    client: reqwest::Client,
    kind: ProviderKind,
    model: String,
    base_url: String,
    api_key: String,
    dimension: Option<usize>,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct CohereRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
}

#[derive(Deserialize)]
struct CohereResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct HuggingFaceRequest<'a> {
    inputs: &'a [String],
}

impl HttpEmbedder {
    pub fn new(
        settings: &EmbeddingSettings,
        endpoints: &ProviderEndpoints,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_key = settings.api_key()?;
        let base_url = match settings.provider {
            ProviderKind::OpenAi => &endpoints.openai_base_url,
            ProviderKind::Cohere => &endpoints.cohere_base_url,
            ProviderKind::HuggingFace => &endpoints.huggingface_base_url,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            kind: settings.provider,
            model: settings.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            dimension: settings.dimension,
        })
    }

    fn endpoint_url(&self) -> String {
        match self.kind {
            ProviderKind::OpenAi => format!("{}/v1/embeddings", self.base_url),
            ProviderKind::Cohere => format!("{}/v1/embed", self.base_url),
            ProviderKind::HuggingFace => format!("{}/models/{}", self.base_url, self.model),
        }
    }

    fn validate_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        let Some(expected) = self.dimension else {
            return Ok(());
        };
        if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != expected) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model,
                expected,
                mismatch.len()
            )));
        }
        Ok(())
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint_url();
        debug!("Embedding {} texts via {} ({})", texts.len(), self.kind, url);

        let request = self.client.post(&url).bearer_auth(&self.api_key);
        let response = match self.kind {
            ProviderKind::OpenAi => {
                request
                    .json(&OpenAiRequest {
                        model: &self.model,
                        input: texts,
                    })
                    .send()
                    .await?
            }
            ProviderKind::Cohere => {
                request
                    .json(&CohereRequest {
                        model: &self.model,
                        texts,
                        input_type: "search_document",
                    })
                    .send()
                    .await?
            }
            ProviderKind::HuggingFace => {
                request
                    .json(&HuggingFaceRequest { inputs: texts })
                    .send()
                    .await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Provider '{}' returned {}: {}",
                self.kind,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let embeddings = match self.kind {
            ProviderKind::OpenAi => {
                let parsed: OpenAiResponse = response.json().await?;
                parsed.data.into_iter().map(|d| d.embedding).collect()
            }
            ProviderKind::Cohere => {
                let parsed: CohereResponse = response.json().await?;
                parsed.embeddings
            }
            ProviderKind::HuggingFace => response.json::<Vec<Vec<f32>>>().await?,
        };

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.request_embeddings(&texts).await?;

        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Provider '{}' returned {} embeddings for {} inputs",
                self.kind,
                embeddings.len(),
                texts.len()
            )));
        }

        self.validate_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        match self.kind {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Cohere => "cohere",
            ProviderKind::HuggingFace => "huggingface",
        }
    }
}
