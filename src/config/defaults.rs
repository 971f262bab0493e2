//! Default values for configuration

/// Default PDF proxy endpoint
pub fn default_proxy_url() -> String {
    std::env::var("SCRIVENER_PROXY_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8787/pdf-proxy".to_string())
}

/// Default Google Drive listing endpoint
pub fn default_drive_list_url() -> String {
    std::env::var("SCRIVENER_DRIVE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8787/drive-import".to_string())
}

/// Default OpenAI API base URL
pub fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

/// Default Cohere API base URL
pub fn default_cohere_base_url() -> String {
    "https://api.cohere.ai".to_string()
}

/// Default HuggingFace inference API base URL
pub fn default_huggingface_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

/// Default request timeout in seconds
pub fn default_request_timeout() -> u64 {
    30
}

/// Default probe attempts (fixed count, small by design of the health check)
pub fn default_probe_attempts() -> u32 {
    3
}

/// Default initial probe backoff in milliseconds
pub fn default_probe_backoff_ms() -> u64 {
    500
}

/// Default capacity of the probe history ring buffer
pub fn default_probe_history_capacity() -> usize {
    20
}

/// Default delay between sequential document imports in milliseconds
pub fn default_import_delay_ms() -> u64 {
    1000
}
