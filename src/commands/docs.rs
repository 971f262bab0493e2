//! Document management commands

use super::ingest::{ingest_one, IngestStats, Payload};
use crate::config::{Config, ConfigStore};
use crate::error::{Error, Result};
use crate::meta::{Document, DocumentStatus, MetaDb};
use crate::parse::{is_binary_content, ContentType};
use crate::proxy::PdfProxyClient;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Document listing entry with per-document counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub source_type: String,
    pub uri: String,
    pub title: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub chunk_count: usize,
    pub embedding_count: usize,
    pub created_at: String,
}

/// List all documents with chunk and embedding counts
pub async fn cmd_list_documents(
    db: &MetaDb,
    status: Option<DocumentStatus>,
) -> Result<Vec<DocumentInfo>> {
    let docs = match status {
        Some(s) => db.list_documents_by_status(s).await?,
        None => db.list_documents().await?,
    };

    let mut result = Vec::with_capacity(docs.len());
    for doc in docs {
        let chunk_count = db.get_chunks(&doc.id).await?.len();
        let embedding_count = db.count_embeddings_for_document(&doc.id).await?;
        result.push(DocumentInfo {
            id: doc.id,
            source_type: doc.source_type,
            uri: doc.uri,
            title: doc.title,
            status: doc.status,
            error: doc.error,
            chunk_count,
            embedding_count,
            created_at: doc.created_at,
        });
    }
    Ok(result)
}

/// Remove a document along with its chunks and embeddings
pub async fn cmd_remove_document(db: &MetaDb, doc_id: &str) -> Result<()> {
    if db.get_document(doc_id).await?.is_none() {
        return Err(Error::DocumentNotFound(doc_id.to_string()));
    }
    db.delete_document(doc_id).await?;
    info!("Removed document {}", doc_id);
    Ok(())
}

/// Retry processing for a document, re-reading its source
pub async fn cmd_retry_document(
    config: &Config,
    db: &MetaDb,
    doc_id: &str,
) -> Result<IngestStats> {
    let doc = db
        .get_document(doc_id)
        .await?
        .ok_or_else(|| Error::DocumentNotFound(doc_id.to_string()))?;

    let mut stats = IngestStats::default();
    let store = ConfigStore::new(db.pool().clone());

    let payload = build_payload(config, &doc).await?;
    ingest_one(db, &store, &doc, payload, &mut stats).await?;
    Ok(stats)
}

/// Re-acquire a document's source bytes for retry
async fn build_payload(config: &Config, doc: &Document) -> Result<Payload> {
    let is_pdf = doc
        .mime_type
        .as_deref()
        .map(|m| ContentType::from_mime(m) == ContentType::Pdf)
        .unwrap_or(false)
        || doc.uri.to_lowercase().ends_with(".pdf");

    match doc.source_type.as_str() {
        "file" => {
            let path = Path::new(&doc.uri);
            let bytes = std::fs::read(path)
                .map_err(|_| Error::InvalidPath(format!("{} no longer exists", doc.uri)))?;
            if is_pdf {
                Ok(Payload::Pdf(bytes))
            } else {
                if is_binary_content(&bytes) {
                    return Err(Error::Parse(format!("{} is not a text file", doc.uri)));
                }
                let content_type = ContentType::detect(Some(path), doc.mime_type.as_deref());
                Ok(Payload::Text {
                    content: String::from_utf8_lossy(&bytes).into_owned(),
                    content_type,
                })
            }
        }
        _ => {
            let proxy = PdfProxyClient::new(
                &config.proxy_url,
                config.probe.clone(),
                config.request_timeout_secs,
            )?;
            let fetched = proxy
                .fetch(&doc.uri, doc.title.as_deref(), Some(&doc.id))
                .await?;
            if is_pdf {
                Ok(Payload::Pdf(fetched.bytes))
            } else {
                let content_type = ContentType::detect(None, doc.mime_type.as_deref());
                Ok(Payload::Text {
                    content: String::from_utf8_lossy(&fetched.bytes).into_owned(),
                    content_type,
                })
            }
        }
    }
}

/// Delete all stored embeddings; returns the number removed
pub async fn cmd_clear_embeddings(db: &MetaDb) -> Result<u64> {
    let removed = db.clear_embeddings().await?;
    info!("Cleared {} embeddings", removed);
    Ok(removed)
}

/// Print document list to console
pub fn print_documents(docs: &[DocumentInfo]) {
    println!("\n📄 Documents\n");

    if docs.is_empty() {
        println!("No documents ingested. Use 'scrivener ingest' to add some.");
        return;
    }

    for doc in docs {
        let status_mark = match doc.status.as_str() {
            "completed" => "✓",
            "failed" => "✗",
            "processing" => "…",
            _ => "·",
        };
        println!(
            "{} {} [{}]",
            status_mark,
            doc.title.as_deref().unwrap_or(&doc.uri),
            doc.status
        );
        println!("  ID: {}", doc.id);
        println!("  URI: {}", doc.uri);
        println!(
            "  Chunks: {}, Embeddings: {}",
            doc.chunk_count, doc.embedding_count
        );
        if let Some(ref error) = doc.error {
            println!("  Error: {}", error);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::SourceType;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Config, MetaDb) {
        let tmp = TempDir::new().unwrap();
        let config = Config::default();
        let db = MetaDb::connect(&tmp.path().join("test.db")).await.unwrap();
        db.init_schema().await.unwrap();
        (tmp, config, db)
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (_tmp, _config, db) = setup().await;

        let ok = Document::new(SourceType::File, "/a.pdf".to_string());
        db.insert_document(&ok).await.unwrap();
        db.update_document_status(&ok.id, DocumentStatus::Completed, None)
            .await
            .unwrap();

        let bad = Document::new(SourceType::File, "/b.pdf".to_string());
        db.insert_document(&bad).await.unwrap();
        db.update_document_status(&bad.id, DocumentStatus::Failed, Some("boom"))
            .await
            .unwrap();

        let all = cmd_list_documents(&db, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let failed = cmd_list_documents(&db, Some(DocumentStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_remove_unknown_document() {
        let (_tmp, _config, db) = setup().await;
        let err = cmd_remove_document(&db, "missing").await;
        assert!(matches!(err, Err(Error::DocumentNotFound(_))));
    }

    #[tokio::test]
    async fn test_retry_failed_file_document_recovers() {
        let (tmp, config, db) = setup().await;

        // A markdown file whose first ingest "failed" (simulated), then retried
        let path = tmp.path().join("doc.md");
        std::fs::write(&path, "# Title\n\nBody text for the retry.").unwrap();

        let mut doc = Document::new(SourceType::File, path.display().to_string());
        doc.mime_type = Some("text/markdown".to_string());
        db.insert_document(&doc).await.unwrap();
        db.update_document_status(&doc.id, DocumentStatus::Failed, Some("transient"))
            .await
            .unwrap();

        let stats = cmd_retry_document(&config, &db, &doc.id).await.unwrap();
        assert_eq!(stats.docs_processed, 1);

        let loaded = db.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(loaded.get_status().unwrap(), DocumentStatus::Completed);
        assert_eq!(loaded.title, Some("Title".to_string()));
    }
}
