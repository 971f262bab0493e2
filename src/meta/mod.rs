//! Metadata storage using SQLite
//!
//! This module handles all local metadata storage including:
//! - Documents (ingested files, URLs, and Drive imports)
//! - Chunks (split text with character-offset positions)
//! - Embeddings (vectors keyed by chunk and provider/model)
//! - Config entries (via the config store, which shares this pool)

mod schema;

pub use schema::*;

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Where a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Url,
    Drive,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::File => write!(f, "file"),
            SourceType::Url => write!(f, "url"),
            SourceType::Drive => write!(f, "drive"),
        }
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SourceType::File),
            "url" => Ok(SourceType::Url),
            "drive" => Ok(SourceType::Drive),
            _ => Err(Error::Parse(format!("Unknown source type: {}", s))),
        }
    }
}

/// Document processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Pending => write!(f, "pending"),
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Completed => write!(f, "completed"),
            DocumentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            _ => Err(Error::Parse(format!("Unknown document status: {}", s))),
        }
    }
}

/// An ingested document
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_type: String,
    pub uri: String,
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub content: Option<String>,
    pub content_hash: Option<String>,
    pub processed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    pub fn new(source_type: SourceType, uri: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            source_type: source_type.to_string(),
            uri,
            title: None,
            mime_type: None,
            status: DocumentStatus::Pending.to_string(),
            error: None,
            content: None,
            content_hash: None,
            processed_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn get_status(&self) -> Result<DocumentStatus> {
        self.status.parse()
    }
}

/// A stored text chunk
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChunkRow {
    pub id: String,
    pub doc_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub char_start: i64,
    pub char_end: i64,
    pub metadata_json: Option<String>,
    pub chunk_hash: String,
    pub created_at: String,
}

impl ChunkRow {
    pub fn new(
        doc_id: String,
        chunk_index: i64,
        content: String,
        char_start: i64,
        char_end: i64,
        metadata_json: Option<String>,
    ) -> Self {
        let chunk_hash = blake3::hash(content.as_bytes()).to_hex().to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            doc_id,
            chunk_index,
            content,
            char_start,
            char_end,
            metadata_json,
            chunk_hash,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// A stored embedding vector
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EmbeddingRow {
    pub id: String,
    pub chunk_id: String,
    pub doc_id: String,
    pub vector_json: String,
    pub provider: String,
    pub model: String,
    /// Cosine-similarity floor configured when this vector was generated
    pub similarity_threshold: f64,
    pub created_at: String,
}

impl EmbeddingRow {
    pub fn new(
        chunk_id: String,
        doc_id: String,
        vector: &[f32],
        provider: &str,
        model: &str,
        similarity_threshold: f32,
    ) -> Result<Self> {
        // Derived from the chunk/provider/model triple so re-embedding the
        // same chunk upserts under a stable id
        let id = Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("{}:{}:{}", chunk_id, provider, model).as_bytes(),
        )
        .to_string();
        Ok(Self {
            id,
            chunk_id,
            doc_id,
            vector_json: serde_json::to_string(vector)?,
            provider: provider.to_string(),
            model: model.to_string(),
            similarity_threshold: similarity_threshold as f64,
            created_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn vector(&self) -> Result<Vec<f32>> {
        Ok(serde_json::from_str(&self.vector_json)?)
    }
}

/// Global statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub document_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
    pub chunk_count: usize,
    pub embedding_count: usize,
}

/// Metadata database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the metadata database, creating the file if needed
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Connect and auto-initialize the schema if it is missing
    pub async fn open(db_path: &Path) -> Result<Self> {
        let db = Self::connect(db_path).await?;
        if !db.is_initialized().await? {
            db.init_schema().await?;
        }
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='documents'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== Document Operations =====

    /// Insert a new document record
    pub async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, source_type, uri, title, mime_type, status, error,
                                   content, content_hash, processed_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.source_type)
        .bind(&doc.uri)
        .bind(&doc.title)
        .bind(&doc.mime_type)
        .bind(&doc.status)
        .bind(&doc.error)
        .bind(&doc.content)
        .bind(&doc.content_hash)
        .bind(&doc.processed_at)
        .bind(&doc.created_at)
        .bind(&doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get document by ID
    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let doc = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Get document by URI
    pub async fn get_document_by_uri(&self, uri: &str) -> Result<Option<Document>> {
        let doc = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE uri = ?")
            .bind(uri)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// List all documents, newest first
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let docs =
            sqlx::query_as::<_, Document>("SELECT * FROM documents ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(docs)
    }

    /// List documents with a given status
    pub async fn list_documents_by_status(
        &self,
        status: DocumentStatus,
    ) -> Result<Vec<Document>> {
        let docs = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    /// Transition a document's status, recording an error message on failure
    pub async fn update_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let processed_at = match status {
            DocumentStatus::Completed | DocumentStatus::Failed => {
                Some(Utc::now().to_rfc3339())
            }
            _ => None,
        };
        sqlx::query(
            "UPDATE documents SET status = ?, error = ?, processed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(error)
        .bind(processed_at)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store extracted content and its hash on a document
    pub async fn set_document_content(
        &self,
        id: &str,
        title: Option<&str>,
        content: &str,
    ) -> Result<()> {
        let hash = blake3::hash(content.as_bytes()).to_hex().to_string();
        sqlx::query(
            "UPDATE documents SET title = COALESCE(?, title), content = ?, content_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(hash)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a document along with its chunks and embeddings. SQLite foreign
    /// keys are not enforced here, so each table is cleared explicitly in
    /// dependency order.
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM embeddings WHERE doc_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM chunks WHERE doc_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ===== Chunk Operations =====

    /// Replace all chunks for a document. Old chunks and their embeddings go
    /// first so a re-split never leaves a stale tail behind.
    pub async fn replace_chunks(&self, doc_id: &str, chunks: &[ChunkRow]) -> Result<()> {
        sqlx::query("DELETE FROM embeddings WHERE doc_id = ?")
            .bind(doc_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE doc_id = ?")
            .bind(doc_id)
            .execute(&self.pool)
            .await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, doc_id, chunk_index, content, char_start, char_end,
                                    metadata_json, chunk_hash, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.doc_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(chunk.char_start)
            .bind(chunk.char_end)
            .bind(&chunk.metadata_json)
            .bind(&chunk.chunk_hash)
            .bind(&chunk.created_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Get chunks for a document, in index order
    pub async fn get_chunks(&self, doc_id: &str) -> Result<Vec<ChunkRow>> {
        let chunks = sqlx::query_as::<_, ChunkRow>(
            "SELECT * FROM chunks WHERE doc_id = ? ORDER BY chunk_index",
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chunks)
    }

    /// Chunks across all documents that have no embedding for the given
    /// provider/model pair
    pub async fn get_unembedded_chunks(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<Vec<ChunkRow>> {
        let chunks = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT c.* FROM chunks c
            WHERE NOT EXISTS (
                SELECT 1 FROM embeddings e
                WHERE e.chunk_id = c.id AND e.provider = ? AND e.model = ?
            )
            ORDER BY c.doc_id, c.chunk_index
            "#,
        )
        .bind(provider)
        .bind(model)
        .fetch_all(&self.pool)
        .await?;
        Ok(chunks)
    }

    // ===== Embedding Operations =====

    /// Insert embedding rows
    pub async fn insert_embeddings(&self, embeddings: &[EmbeddingRow]) -> Result<()> {
        for emb in embeddings {
            sqlx::query(
                r#"
                INSERT INTO embeddings (id, chunk_id, doc_id, vector_json, provider, model,
                                        similarity_threshold, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(chunk_id, provider, model) DO UPDATE SET
                    vector_json = excluded.vector_json,
                    similarity_threshold = excluded.similarity_threshold,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&emb.id)
            .bind(&emb.chunk_id)
            .bind(&emb.doc_id)
            .bind(&emb.vector_json)
            .bind(&emb.provider)
            .bind(&emb.model)
            .bind(emb.similarity_threshold)
            .bind(&emb.created_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Delete all stored embeddings; returns the number removed
    pub async fn clear_embeddings(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM embeddings")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Embedding count for a document
    pub async fn count_embeddings_for_document(&self, doc_id: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings WHERE doc_id = ?")
            .bind(doc_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    // ===== Statistics =====

    /// Get global statistics
    pub async fn get_global_stats(&self) -> Result<GlobalStats> {
        let document_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let pending_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        let failed_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE status = 'failed'")
                .fetch_one(&self.pool)
                .await?;
        let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let embedding_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await?;

        Ok(GlobalStats {
            document_count: document_count as usize,
            pending_count: pending_count as usize,
            failed_count: failed_count as usize,
            chunk_count: chunk_count as usize,
            embedding_count: embedding_count as usize,
        })
    }
}
