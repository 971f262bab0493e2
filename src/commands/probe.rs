//! Probe command implementation

use crate::config::Config;
use crate::error::Result;
use crate::progress::add_spinner;
use crate::proxy::{ConnectionAttempt, ConnectionHistory, PdfProxyClient, ProbeOutcome};
use serde::Serialize;

/// Probe report including the attempt-by-attempt history
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub proxy_url: String,
    pub outcome: ProbeOutcome,
    pub history: Vec<ConnectionAttempt>,
}

/// Test connectivity to the PDF proxy
pub async fn cmd_probe(config: &Config) -> Result<ProbeReport> {
    let client = PdfProxyClient::new(
        &config.proxy_url,
        config.probe.clone(),
        config.request_timeout_secs,
    )?;

    let spinner = add_spinner("Probing proxy");
    let mut history = ConnectionHistory::new(config.probe.history_capacity);
    let outcome = client.probe(&mut history).await;
    spinner.finish_and_clear();

    Ok(ProbeReport {
        proxy_url: config.proxy_url.clone(),
        outcome,
        history: history.iter().cloned().collect(),
    })
}

/// Print probe report to console
pub fn print_probe_report(report: &ProbeReport) {
    println!("\n📡 Proxy probe\n");
    println!("URL: {}", report.proxy_url);

    if report.outcome.connected {
        println!(
            "Status: ✓ Connected ({} ms, attempt {})",
            report.outcome.latency_ms, report.outcome.attempts_used
        );
    } else {
        println!(
            "Status: ✗ Not connected after {} attempts",
            report.outcome.attempts_used
        );
        if let Some(ref message) = report.outcome.message {
            println!("Last error: {}", message);
        }
    }

    if report.history.len() > 1 {
        println!("\nAttempts:");
        for attempt in &report.history {
            let mark = if attempt.success { "✓" } else { "✗" };
            println!(
                "  {} {} ms{}",
                mark,
                attempt.latency_ms,
                attempt
                    .message
                    .as_deref()
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default()
            );
        }
    }
}
