//! Configuration management for scrivener
//!
//! Two layers of configuration exist:
//! - the app config: a TOML file holding endpoint URLs and local paths,
//!   loaded once at startup (this module);
//! - the pipeline configuration store: typed key/value records in SQLite,
//!   editable at runtime through `scrivener config` (see `store`/`domains`).

mod defaults;
pub mod domains;
mod store;

pub use defaults::*;
pub use domains::*;
pub use store::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PDF proxy endpoint URL
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    /// Google Drive listing/import endpoint URL
    #[serde(default = "default_drive_list_url")]
    pub drive_list_url: String,

    /// Path to a JSON file with Drive service-account credentials
    /// (client_email, private_key). Never stored in the config store.
    #[serde(default)]
    pub drive_credentials_file: Option<PathBuf>,

    /// Embedding provider base URLs (overridable for self-hosted gateways)
    #[serde(default)]
    pub providers: ProviderEndpoints,

    /// Request timeout in seconds for all outbound HTTP calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connection probe settings
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Delay between sequential document imports (milliseconds)
    #[serde(default = "default_import_delay_ms")]
    pub import_delay_ms: u64,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding provider base URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_cohere_base_url")]
    pub cohere_base_url: String,

    #[serde(default = "default_huggingface_base_url")]
    pub huggingface_base_url: String,
}

/// Connection probe settings (the only retrying path in the system)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Number of attempts before reporting failure
    #[serde(default = "default_probe_attempts")]
    pub attempts: u32,

    /// Initial backoff between attempts (milliseconds, doubles per attempt)
    #[serde(default = "default_probe_backoff_ms")]
    pub backoff_ms: u64,

    /// Capacity of the probe history ring buffer
    #[serde(default = "default_probe_history_capacity")]
    pub history_capacity: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for scrivener data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: default_proxy_url(),
            drive_list_url: default_drive_list_url(),
            drive_credentials_file: None,
            providers: ProviderEndpoints::default(),
            request_timeout_secs: default_request_timeout(),
            probe: ProbeConfig::default(),
            import_delay_ms: default_import_delay_ms(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai_base_url: default_openai_base_url(),
            cohere_base_url: default_cohere_base_url(),
            huggingface_base_url: default_huggingface_base_url(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: default_probe_attempts(),
            backoff_ms: default_probe_backoff_ms(),
            history_capacity: default_probe_history_capacity(),
        }
    }
}

impl Config {
    /// Get the default base directory for scrivener (~/.scrivener)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".scrivener")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("scrivener.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("scrivener.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if scrivener is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.probe.attempts == 0 {
            return Err(Error::Config("probe.attempts must be at least 1".to_string()));
        }

        if self.probe.history_capacity == 0 {
            return Err(Error::Config(
                "probe.history_capacity must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }

        for (name, value) in [
            ("proxy_url", &self.proxy_url),
            ("drive_list_url", &self.drive_list_url),
            ("providers.openai_base_url", &self.providers.openai_base_url),
            ("providers.cohere_base_url", &self.providers.cohere_base_url),
            (
                "providers.huggingface_base_url",
                &self.providers.huggingface_base_url,
            ),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }

        Ok(())
    }
}
