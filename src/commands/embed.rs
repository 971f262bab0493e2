//! Embed command implementation

use crate::config::{Config, ConfigDomain, ConfigStore, EMBEDDING_KEY};
use crate::embed::{create_embedder, embed_in_batches};
use crate::error::{Error, Result};
use crate::meta::{EmbeddingRow, MetaDb};
use crate::progress::add_progress_bar;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Statistics from an embedding run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedStats {
    pub provider: String,
    pub model: String,
    pub chunks_embedded: usize,
    pub chunks_up_to_date: bool,
}

/// Embed chunks that have no vector yet for the configured provider/model.
/// When `doc_id` is given, only that document's chunks are considered.
pub async fn cmd_embed(
    config: &Config,
    db: &MetaDb,
    doc_id: Option<&str>,
) -> Result<EmbedStats> {
    let store = ConfigStore::new(db.pool().clone());
    let settings = match store.get_or_default(EMBEDDING_KEY).await? {
        ConfigDomain::Embedding(s) => s,
        _ => {
            return Err(Error::Config(
                "embedding key resolved to a different domain".to_string(),
            ))
        }
    };

    let embedder = create_embedder(&settings, &config.providers, config.request_timeout_secs)?;
    let provider = embedder.provider_name().to_string();
    let model = embedder.model_name().to_string();

    let mut chunks = db.get_unembedded_chunks(&provider, &model).await?;
    if let Some(id) = doc_id {
        if db.get_document(id).await?.is_none() {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        chunks.retain(|c| c.doc_id == id);
    }

    if chunks.is_empty() {
        return Ok(EmbedStats {
            provider,
            model,
            chunks_embedded: 0,
            chunks_up_to_date: true,
        });
    }

    info!(
        "Embedding {} chunks with {} ({})",
        chunks.len(),
        model,
        provider
    );

    let bar = add_progress_bar(chunks.len() as u64, "Embedding chunks");
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embed_in_batches(
        embedder.as_ref(),
        texts,
        settings.batch_size,
        settings.batch_delay_ms,
    )
    .await?;
    bar.set_position(chunks.len() as u64);

    let rows = chunks
        .iter()
        .zip(vectors.iter())
        .map(|(chunk, vector)| {
            EmbeddingRow::new(
                chunk.id.clone(),
                chunk.doc_id.clone(),
                vector,
                &provider,
                &model,
                settings.similarity_threshold,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    db.insert_embeddings(&rows).await?;
    bar.finish_and_clear();

    Ok(EmbedStats {
        provider,
        model,
        chunks_embedded: rows.len(),
        chunks_up_to_date: false,
    })
}

/// Print embedding stats to console
pub fn print_embed_stats(stats: &EmbedStats) {
    println!("\n🧮 Embedding complete\n");
    println!("  Provider: {}", stats.provider);
    println!("  Model: {}", stats.model);
    if stats.chunks_up_to_date {
        println!("  All chunks already embedded.");
    } else {
        println!("  Chunks embedded: {}", stats.chunks_embedded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEndpoints;
    use crate::meta::{ChunkRow, Document, SourceType};
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_with_chunks(chunk_texts: &[&str]) -> (TempDir, MetaDb, String) {
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::connect(&tmp.path().join("test.db")).await.unwrap();
        db.init_schema().await.unwrap();

        let doc = Document::new(SourceType::File, "/doc.md".to_string());
        db.insert_document(&doc).await.unwrap();

        let rows: Vec<ChunkRow> = chunk_texts
            .iter()
            .enumerate()
            .map(|(i, t)| ChunkRow::new(doc.id.clone(), i as i64, t.to_string(), 0, 1, None))
            .collect();
        db.replace_chunks(&doc.id, &rows).await.unwrap();

        (tmp, db, doc.id)
    }

    fn config_pointing_at(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.providers = ProviderEndpoints {
            openai_base_url: server.uri(),
            cohere_base_url: server.uri(),
            huggingface_base_url: server.uri(),
        };
        config
    }

    #[tokio::test]
    async fn test_embed_fills_missing_vectors_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"embedding": [0.1]},
                    {"embedding": [0.2]}
                ]
            })))
            .mount(&server)
            .await;

        let (_tmp, db, doc_id) = setup_with_chunks(&["alpha", "beta"]).await;
        let config = config_pointing_at(&server);
        std::env::set_var("OPENAI_API_KEY", "test-key");

        let stats = cmd_embed(&config, &db, None).await.unwrap();
        assert_eq!(stats.chunks_embedded, 2);
        assert_eq!(db.count_embeddings_for_document(&doc_id).await.unwrap(), 2);

        // The configured similarity threshold is captured on each row
        let thresholds: Vec<f64> =
            sqlx::query_scalar("SELECT similarity_threshold FROM embeddings WHERE doc_id = ?")
                .bind(&doc_id)
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(thresholds.len(), 2);
        assert!(thresholds.iter().all(|t| (t - 0.7).abs() < 1e-6));

        // Second run finds nothing left to embed
        let stats = cmd_embed(&config, &db, None).await.unwrap();
        assert!(stats.chunks_up_to_date);
        assert_eq!(stats.chunks_embedded, 0);
    }

    #[tokio::test]
    async fn test_embed_unknown_document_filter() {
        let server = MockServer::start().await;
        let (_tmp, db, _doc_id) = setup_with_chunks(&["alpha"]).await;
        let config = config_pointing_at(&server);
        std::env::set_var("OPENAI_API_KEY", "test-key");

        let err = cmd_embed(&config, &db, Some("missing")).await;
        assert!(matches!(err, Err(Error::DocumentNotFound(_))));
    }
}
