use crate::models::{PriorityProfile, SearchTuning};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub search: SearchTuning,
    #[serde(default)]
    pub priority: PriorityProfile,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    /// MySQL URL; without it the JSON catalog is used
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_json_path")]
    pub json_path: String,
    pub max_records: Option<usize>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            json_path: default_json_path(),
            max_records: None,
        }
    }
}

fn default_json_path() -> String { "data/properties.json".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub use_cloud: bool,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_cloud_url")]
    pub cloud_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

impl OllamaSettings {
    /// Base URL of the chat API for the selected deployment
    pub fn api_url(&self) -> &str {
        if self.use_cloud {
            &self.cloud_url
        } else {
            &self.base_url
        }
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            use_cloud: false,
            base_url: default_ollama_url(),
            cloud_url: default_ollama_cloud_url(),
            api_key: None,
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}

fn default_true() -> bool { true }
fn default_ollama_url() -> String { "http://localhost:11434/api".to_string() }
fn default_ollama_cloud_url() -> String { "https://ollama.com/api".to_string() }
fn default_ollama_model() -> String { "gpt-oss:20b".to_string() }
fn default_ollama_timeout() -> u64 { 60 }
fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Redis URL for the shared L2 tier; L1 only when absent
    pub redis_url: Option<String>,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_l1_size")]
    pub l1_cache_size: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_cache_ttl(),
            l1_cache_size: default_l1_size(),
        }
    }
}

fn default_cache_ttl() -> u64 { 300 }
fn default_l1_size() -> u64 { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Configuration file (config/default.toml)
    /// 2. Local overrides (config/local.toml)
    /// 3. Environment variables (prefixed with INMO__)
    /// 4. Plain deployment variables (DATABASE_URL, OLLAMA_*, USE_OLLAMA_CLOUD)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., INMO__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("INMO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_legacy_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("INMO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the unprefixed variables deployments already set
fn apply_legacy_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(api_key) = env::var("OLLAMA_API_KEY") {
        builder = builder.set_override("ollama.api_key", api_key)?;
    }
    if let Ok(model) = env::var("OLLAMA_MODEL") {
        builder = builder.set_override("ollama.model", model)?;
    }
    if let Ok(url) = env::var("OLLAMA_URL") {
        builder = builder.set_override("ollama.base_url", local_api_url(&url))?;
    }
    if let Ok(flag) = env::var("USE_OLLAMA_CLOUD") {
        builder = builder.set_override("ollama.use_cloud", parse_flag(&flag))?;
    }

    builder.build()
}

/// `http://host:11434` -> `http://host:11434/api`
fn local_api_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.ends_with("/api") {
        url.to_string()
    } else {
        format!("{}/api", url)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
