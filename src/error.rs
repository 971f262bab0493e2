//! Custom error types for scrivener

use thiserror::Error;

/// Main error type for scrivener operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Drive error: {0}")]
    Drive(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Unknown config key: {0}")]
    ConfigKeyNotFound(String),

    #[error("Not initialized: run 'scrivener init' first")]
    NotInitialized,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Result type alias for scrivener
pub type Result<T> = std::result::Result<T, Error>;

pub mod hint {
    //! Failure categorization for ingest errors
    //!
    //! Error messages from proxies, providers, and the extractor are free
    //! text. Substring matching sorts them into a small set of categories so
    //! failed documents carry actionable advice rather than a raw message.

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FailureHint {
        Network,
        Timeout,
        Permission,
        MalformedPdf,
        GoogleDrive,
        Unknown,
    }

    impl FailureHint {
        pub fn advice(&self) -> &'static str {
            match self {
                FailureHint::Network => {
                    "Check that the proxy is running and the URL is reachable"
                }
                FailureHint::Timeout => {
                    "The request timed out; retry, or raise request_timeout_secs"
                }
                FailureHint::Permission => {
                    "Access was denied; check sharing settings or credentials"
                }
                FailureHint::MalformedPdf => {
                    "The file could not be read as a PDF; it may be encrypted, scanned, or corrupt"
                }
                FailureHint::GoogleDrive => {
                    "Drive links must use the direct-download form; re-run with a converted URL"
                }
                FailureHint::Unknown => "Inspect the recorded error with 'scrivener docs list'",
            }
        }
    }

    /// Categorize a failure message. Timeout is checked before network since
    /// timeout messages usually mention connections too.
    pub fn categorize(message: &str) -> FailureHint {
        let lower = message.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return FailureHint::Timeout;
        }
        if lower.contains("drive.google.com") || lower.contains("alt=media") {
            return FailureHint::GoogleDrive;
        }
        if lower.contains("permission")
            || lower.contains("forbidden")
            || lower.contains("unauthorized")
            || lower.contains("403")
            || lower.contains("401")
        {
            return FailureHint::Permission;
        }
        if lower.contains("connection")
            || lower.contains("network")
            || lower.contains("dns")
            || lower.contains("refused")
            || lower.contains("unreachable")
        {
            return FailureHint::Network;
        }
        if lower.contains("pdf")
            && (lower.contains("malformed")
                || lower.contains("invalid")
                || lower.contains("corrupt")
                || lower.contains("could not extract"))
        {
            return FailureHint::MalformedPdf;
        }

        FailureHint::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::hint::{categorize, FailureHint};

    #[test]
    fn test_timeout_beats_network() {
        assert_eq!(
            categorize("connection timed out after 30s"),
            FailureHint::Timeout
        );
    }

    #[test]
    fn test_network_errors() {
        assert_eq!(categorize("connection refused"), FailureHint::Network);
        assert_eq!(categorize("DNS lookup failed"), FailureHint::Network);
    }

    #[test]
    fn test_permission_errors() {
        assert_eq!(
            categorize("server returned 403 Forbidden"),
            FailureHint::Permission
        );
    }

    #[test]
    fn test_drive_errors() {
        assert_eq!(
            categorize("viewer links serve an HTML preview; use alt=media"),
            FailureHint::GoogleDrive
        );
    }

    #[test]
    fn test_malformed_pdf() {
        assert_eq!(
            categorize("could not extract text from PDF (all strategies exhausted)"),
            FailureHint::MalformedPdf
        );
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(categorize("something odd happened"), FailureHint::Unknown);
        assert!(!FailureHint::Unknown.advice().is_empty());
    }
}
