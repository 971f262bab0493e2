//! Config command implementation
//!
//! Reads and writes the pipeline configuration store (the SQLite key/value
//! layer), not the TOML app config.

use crate::config::{ConfigDomain, ConfigStore, KNOWN_KEYS};
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resolved configuration domain for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigView {
    pub key: String,
    pub value: Value,
    /// False when the value is a built-in default, not a stored row
    pub stored: bool,
}

/// Get one domain, falling back to defaults when unset
pub async fn cmd_config_get(db: &MetaDb, key: &str) -> Result<ConfigView> {
    let store = ConfigStore::new(db.pool().clone());
    let stored = store.get(key).await?;

    let (domain, stored) = match stored {
        Some(domain) => (domain, true),
        None => (ConfigDomain::default_for_key(key)?, false),
    };

    Ok(ConfigView {
        key: key.to_string(),
        value: domain.to_value()?,
        stored,
    })
}

/// Validate and store a domain value from a JSON string
pub async fn cmd_config_set(db: &MetaDb, key: &str, value_json: &str) -> Result<ConfigView> {
    let value: Value = serde_json::from_str(value_json)
        .map_err(|e| Error::Config(format!("Value is not valid JSON: {}", e)))?;

    let store = ConfigStore::new(db.pool().clone());
    let domain = store.set(key, value).await?;

    Ok(ConfigView {
        key: key.to_string(),
        value: domain.to_value()?,
        stored: true,
    })
}

/// Delete a stored key, reverting it to defaults
pub async fn cmd_config_delete(db: &MetaDb, key: &str) -> Result<bool> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(Error::ConfigKeyNotFound(key.to_string()));
    }
    let store = ConfigStore::new(db.pool().clone());
    store.delete(key).await
}

/// Show all domains, resolved against defaults
pub async fn cmd_config_show(db: &MetaDb) -> Result<Vec<ConfigView>> {
    let mut views = Vec::with_capacity(KNOWN_KEYS.len());
    for key in KNOWN_KEYS {
        views.push(cmd_config_get(db, key).await?);
    }
    Ok(views)
}

/// Print one config view to console
pub fn print_config_view(view: &ConfigView) {
    let origin = if view.stored { "stored" } else { "default" };
    println!("\n{} ({})", view.key, origin);
    match serde_json::to_string_pretty(&view.value) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", view.value),
    }
}

/// Print all config views to console
pub fn print_config_show(views: &[ConfigView]) {
    println!("\n⚙️  Pipeline configuration");
    for view in views {
        print_config_view(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CHUNKING_KEY;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, MetaDb) {
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::connect(&tmp.path().join("test.db")).await.unwrap();
        db.init_schema().await.unwrap();
        (tmp, db)
    }

    #[tokio::test]
    async fn test_get_unset_key_reports_default() {
        let (_tmp, db) = setup().await;
        let view = cmd_config_get(&db, CHUNKING_KEY).await.unwrap();
        assert!(!view.stored);
        assert_eq!(view.value["chunk_size"], 1000);
    }

    #[tokio::test]
    async fn test_set_get_delete_cycle() {
        let (_tmp, db) = setup().await;

        let view = cmd_config_set(&db, CHUNKING_KEY, r#"{"chunk_size": 600, "overlap": 60}"#)
            .await
            .unwrap();
        assert!(view.stored);
        assert_eq!(view.value["chunk_size"], 600);

        let view = cmd_config_get(&db, CHUNKING_KEY).await.unwrap();
        assert!(view.stored);
        assert_eq!(view.value["chunk_size"], 600);

        assert!(cmd_config_delete(&db, CHUNKING_KEY).await.unwrap());
        let view = cmd_config_get(&db, CHUNKING_KEY).await.unwrap();
        assert!(!view.stored);
    }

    #[tokio::test]
    async fn test_unknown_key_rejected() {
        let (_tmp, db) = setup().await;
        assert!(cmd_config_get(&db, "telemetry").await.is_err());
        assert!(cmd_config_set(&db, "telemetry", "{}").await.is_err());
        assert!(cmd_config_delete(&db, "telemetry").await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_json_value_rejected() {
        let (_tmp, db) = setup().await;
        let err = cmd_config_set(&db, CHUNKING_KEY, "{not json").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_show_lists_all_domains() {
        let (_tmp, db) = setup().await;
        let views = cmd_config_show(&db).await.unwrap();
        assert_eq!(views.len(), KNOWN_KEYS.len());
    }
}
