//! Key/value configuration store backed by SQLite.
//!
//! Keys name configuration domains; values are JSON. Writes are
//! last-write-wins with no versioning. Every value passes through
//! `ConfigDomain::from_key_value` on the way in, so the table never holds an
//! unvalidated blob.

use super::domains::ConfigDomain;
use crate::error::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

/// A raw configuration row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfigEntry {
    pub key: String,
    pub value_json: String,
    pub updated_at: String,
}

/// Handle to the configuration table
#[derive(Clone)]
pub struct ConfigStore {
    pool: SqlitePool,
}

impl ConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a domain value; falls back to defaults when the key is absent
    pub async fn get_or_default(&self, key: &str) -> Result<ConfigDomain> {
        match self.get(key).await? {
            Some(domain) => Ok(domain),
            None => ConfigDomain::default_for_key(key),
        }
    }

    /// Read a domain value by key
    pub async fn get(&self, key: &str) -> Result<Option<ConfigDomain>> {
        let row: Option<ConfigEntry> =
            sqlx::query_as("SELECT key, value_json, updated_at FROM config_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(entry) => {
                let value: serde_json::Value = serde_json::from_str(&entry.value_json)?;
                Ok(Some(ConfigDomain::from_key_value(key, value)?))
            }
            None => Ok(None),
        }
    }

    /// Validate and upsert a domain value (last write wins)
    pub async fn set(&self, key: &str, value: serde_json::Value) -> Result<ConfigDomain> {
        let domain = ConfigDomain::from_key_value(key, value)?;
        let json = serde_json::to_string(&domain.to_value()?)?;
        let now = Utc::now().to_rfc3339();

        debug!("Upserting config key '{}'", key);

        sqlx::query(
            r#"
            INSERT INTO config_entries (key, value_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json,
                                           updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(domain)
    }

    /// Delete a key; returns true if a row was removed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM config_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all stored entries (raw rows, for display)
    pub async fn list(&self) -> Result<Vec<ConfigEntry>> {
        let rows = sqlx::query_as(
            "SELECT key, value_json, updated_at FROM config_entries ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::domains::{ChunkingSettings, CHUNKING_KEY, EMBEDDING_KEY};
    use crate::meta::MetaDb;
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, ConfigStore) {
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::connect(&tmp.path().join("test.db")).await.unwrap();
        db.init_schema().await.unwrap();
        (tmp, ConfigStore::new(db.pool().clone()))
    }

    #[tokio::test]
    async fn test_set_get_delete_roundtrip() {
        let (_tmp, store) = test_store().await;

        assert!(store.get(CHUNKING_KEY).await.unwrap().is_none());

        store
            .set(CHUNKING_KEY, json!({"strategy": "sentence", "chunk_size": 500, "overlap": 50}))
            .await
            .unwrap();

        let loaded = store.get(CHUNKING_KEY).await.unwrap().unwrap();
        match loaded {
            ConfigDomain::Chunking(s) => assert_eq!(s.chunk_size, 500),
            _ => panic!("wrong domain"),
        }

        assert!(store.delete(CHUNKING_KEY).await.unwrap());
        assert!(!store.delete(CHUNKING_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (_tmp, store) = test_store().await;

        store
            .set(CHUNKING_KEY, json!({"chunk_size": 400, "overlap": 40}))
            .await
            .unwrap();
        store
            .set(CHUNKING_KEY, json!({"chunk_size": 900, "overlap": 40}))
            .await
            .unwrap();

        match store.get(CHUNKING_KEY).await.unwrap().unwrap() {
            ConfigDomain::Chunking(s) => assert_eq!(s.chunk_size, 900),
            _ => panic!("wrong domain"),
        }
    }

    #[tokio::test]
    async fn test_invalid_value_never_stored() {
        let (_tmp, store) = test_store().await;

        let err = store
            .set(EMBEDDING_KEY, json!({"similarity_threshold": 2.0}))
            .await;
        assert!(err.is_err());
        assert!(store.get(EMBEDDING_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_or_default() {
        let (_tmp, store) = test_store().await;
        let domain = store.get_or_default(CHUNKING_KEY).await.unwrap();
        match domain {
            ConfigDomain::Chunking(s) => {
                let defaults = ChunkingSettings::default();
                assert_eq!(s.chunk_size, defaults.chunk_size);
            }
            _ => panic!("wrong domain"),
        }
    }
}
