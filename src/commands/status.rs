//! Status command implementation

use crate::config::{Config, ProbeConfig};
use crate::error::Result;
use crate::meta::{GlobalStats, MetaDb};
use crate::proxy::{ConnectionHistory, PdfProxyClient};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub proxy_url: String,
    pub proxy_connected: bool,
    pub drive_configured: bool,
    pub db_stats: GlobalStats,
}

/// Get system status
pub async fn cmd_status(config: &Config, db: &MetaDb) -> Result<StatusInfo> {
    info!("Getting status");

    let db_stats = db.get_global_stats().await?;

    // A single quick attempt; the full retry ladder belongs to `probe`
    let quick_probe = ProbeConfig {
        attempts: 1,
        ..config.probe.clone()
    };
    let proxy_connected = match PdfProxyClient::new(
        &config.proxy_url,
        quick_probe,
        config.request_timeout_secs,
    ) {
        Ok(client) => {
            let mut history = ConnectionHistory::new(1);
            client.probe(&mut history).await.connected
        }
        Err(_) => false,
    };

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        proxy_url: config.proxy_url.clone(),
        proxy_connected,
        drive_configured: config.drive_credentials_file.is_some(),
        db_stats,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 scrivener Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("\nPDF proxy:");
    println!("  URL: {}", status.proxy_url);
    println!(
        "  Status: {}",
        if status.proxy_connected {
            "✓ Connected"
        } else {
            "✗ Not connected"
        }
    );
    println!(
        "\nDrive import: {}",
        if status.drive_configured {
            "configured"
        } else {
            "not configured (set drive_credentials_file)"
        }
    );
    println!("\nDatabase Stats:");
    println!("  Documents: {}", status.db_stats.document_count);
    println!("  Pending: {}", status.db_stats.pending_count);
    println!("  Failed: {}", status.db_stats.failed_count);
    println!("  Chunks: {}", status.db_stats.chunk_count);
    println!("  Embeddings: {}", status.db_stats.embedding_count);
}
