//! SQLite schema definition

/// SQL schema for the metadata database
pub const SCHEMA_SQL: &str = r#"
-- Config entries: validated domain settings, one JSON value per key
CREATE TABLE IF NOT EXISTS config_entries (
    key TEXT PRIMARY KEY,
    value_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Documents: ingested files, URLs, and Drive imports
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    source_type TEXT NOT NULL,
    uri TEXT NOT NULL UNIQUE,
    title TEXT,
    mime_type TEXT,
    status TEXT NOT NULL,
    error TEXT,
    content TEXT,
    content_hash TEXT,
    processed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Chunks: split text with character-offset positions
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    doc_id TEXT NOT NULL REFERENCES documents(id),
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    char_start INTEGER NOT NULL,
    char_end INTEGER NOT NULL,
    metadata_json TEXT,
    chunk_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(doc_id, chunk_index)
);

-- Embeddings: one vector per chunk per provider/model, with the similarity
-- threshold that was configured when the vector was generated
CREATE TABLE IF NOT EXISTS embeddings (
    id TEXT PRIMARY KEY,
    chunk_id TEXT NOT NULL REFERENCES chunks(id),
    doc_id TEXT NOT NULL REFERENCES documents(id),
    vector_json TEXT NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    similarity_threshold REAL NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(chunk_id, provider, model)
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
CREATE INDEX IF NOT EXISTS idx_documents_hash ON documents(content_hash);
CREATE INDEX IF NOT EXISTS idx_chunks_doc ON chunks(doc_id);
CREATE INDEX IF NOT EXISTS idx_chunks_hash ON chunks(chunk_hash);
CREATE INDEX IF NOT EXISTS idx_embeddings_doc ON embeddings(doc_id);
CREATE INDEX IF NOT EXISTS idx_embeddings_chunk ON embeddings(chunk_id);
"#;
