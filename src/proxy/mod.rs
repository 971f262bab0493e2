//! PDF proxy client
//!
//! Remote PDFs are fetched through a small proxy service that downloads the
//! file server-side and returns the bytes base64-encoded in JSON. That keeps
//! CORS-restricted and Drive-hosted files reachable without handing this
//! process any download credentials. The proxy also answers a connection
//! test action used by the probe command.

mod history;

pub use history::{ConnectionAttempt, ConnectionHistory};

use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest backoff between probe attempts
const MAX_BACKOFF_MS: u64 = 8000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_id: Option<&'a str>,
    store_in_database: bool,
}

#[derive(Deserialize)]
struct FetchResponse {
    data: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Serialize)]
struct ProbeRequest<'a> {
    action: &'a str,
}

#[derive(Deserialize)]
struct ProbeResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// A fetched PDF payload
#[derive(Debug, Clone)]
pub struct FetchedPdf {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Result of probing the proxy
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub connected: bool,
    pub attempts_used: u32,
    pub latency_ms: u64,
    pub message: Option<String>,
}

/// Client for the PDF proxy service
pub struct PdfProxyClient {
    client: reqwest::Client,
    proxy_url: String,
    probe_config: ProbeConfig,
}

impl PdfProxyClient {
    pub fn new(proxy_url: &str, probe_config: ProbeConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            proxy_url: proxy_url.to_string(),
            probe_config,
        })
    }

    /// Fetch a remote PDF through the proxy, decoding the base64 payload
    pub async fn fetch(
        &self,
        url: &str,
        title: Option<&str>,
        document_id: Option<&str>,
    ) -> Result<FetchedPdf> {
        debug!("Fetching PDF via proxy: {}", url);

        let response = self
            .client
            .post(&self.proxy_url)
            .json(&FetchRequest {
                url,
                title,
                document_id,
                store_in_database: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Proxy(format!(
                "Proxy fetch failed with {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: FetchResponse = response.json().await?;
        let bytes = STANDARD
            .decode(parsed.data.as_bytes())
            .map_err(|e| Error::Proxy(format!("Proxy returned invalid base64 payload: {}", e)))?;

        Ok(FetchedPdf {
            bytes,
            content_type: parsed.content_type,
        })
    }

    /// Probe the proxy with retries and exponential backoff. Every attempt
    /// is recorded in `history`; the outcome reflects the final attempt.
    pub async fn probe(&self, history: &mut ConnectionHistory) -> ProbeOutcome {
        let attempts = self.probe_config.attempts.max(1);
        let mut backoff_ms = self.probe_config.backoff_ms;
        let mut last_message = None;
        let mut last_latency = 0;

        for attempt in 1..=attempts {
            let started = Instant::now();
            let result = self.probe_once().await;
            let latency_ms = started.elapsed().as_millis() as u64;
            last_latency = latency_ms;

            match result {
                Ok(()) => {
                    history.record(true, latency_ms, None);
                    return ProbeOutcome {
                        connected: true,
                        attempts_used: attempt,
                        latency_ms,
                        message: None,
                    };
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        "Proxy probe attempt {}/{} failed: {}",
                        attempt, attempts, message
                    );
                    history.record(false, latency_ms, Some(message.clone()));
                    last_message = Some(message);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }

        ProbeOutcome {
            connected: false,
            attempts_used: attempts,
            latency_ms: last_latency,
            message: last_message,
        }
    }

    async fn probe_once(&self) -> Result<()> {
        let response = self
            .client
            .post(&self.proxy_url)
            .json(&ProbeRequest {
                action: "connection_test",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Proxy(format!(
                "Proxy returned {} to connection test",
                status
            )));
        }

        let parsed: ProbeResponse = response.json().await?;
        if parsed.status == "connected" {
            Ok(())
        } else {
            Err(Error::Proxy(format!(
                "Proxy reported status '{}'{}",
                parsed.status,
                parsed
                    .message
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe_config(attempts: u32) -> ProbeConfig {
        ProbeConfig {
            attempts,
            backoff_ms: 1,
            history_capacity: 20,
        }
    }

    #[tokio::test]
    async fn test_fetch_decodes_base64_payload() {
        let server = MockServer::start().await;
        let pdf_bytes = b"%PDF-1.4 fake content";
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"url": "https://example.com/a.pdf"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": STANDARD.encode(pdf_bytes),
                "content_type": "application/pdf"
            })))
            .mount(&server)
            .await;

        let client = PdfProxyClient::new(&server.uri(), probe_config(1), 5).unwrap();
        let fetched = client
            .fetch("https://example.com/a.pdf", Some("A"), None)
            .await
            .unwrap();

        assert_eq!(fetched.bytes, pdf_bytes);
        assert_eq!(fetched.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_base64() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": "!!! not base64 !!!"
            })))
            .mount(&server)
            .await;

        let client = PdfProxyClient::new(&server.uri(), probe_config(1), 5).unwrap();
        let err = client
            .fetch("https://example.com/a.pdf", None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[tokio::test]
    async fn test_probe_success_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"action": "connection_test"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "connected"})),
            )
            .mount(&server)
            .await;

        let client = PdfProxyClient::new(&server.uri(), probe_config(3), 5).unwrap();
        let mut history = ConnectionHistory::new(20);
        let outcome = client.probe(&mut history).await;

        assert!(outcome.connected);
        assert_eq!(outcome.attempts_used, 1);
        assert_eq!(history.len(), 1);
        assert!(history.latest().unwrap().success);
    }

    #[tokio::test]
    async fn test_probe_retries_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = PdfProxyClient::new(&server.uri(), probe_config(3), 5).unwrap();
        let mut history = ConnectionHistory::new(20);
        let outcome = client.probe(&mut history).await;

        assert!(!outcome.connected);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(history.len(), 3);
        assert!(outcome.message.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_probe_rejects_unexpected_status_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "degraded",
                "message": "database unavailable"
            })))
            .mount(&server)
            .await;

        let client = PdfProxyClient::new(&server.uri(), probe_config(1), 5).unwrap();
        let mut history = ConnectionHistory::new(20);
        let outcome = client.probe(&mut history).await;

        assert!(!outcome.connected);
        let message = outcome.message.unwrap();
        assert!(message.contains("degraded"));
        assert!(message.contains("database unavailable"));
    }
}
