use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
const DEFAULT_COLLECTION_NAME: &str = "pdf_collection";
const DEFAULT_QDRANT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 8000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the PDF question answering service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key sent to the embedding provider.
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible embeddings API.
    pub openai_base_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors; must match the collection.
    pub embedding_dimension: usize,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Name of the Qdrant collection holding every document chunk.
    pub qdrant_collection_name: String,
    /// Client-level timeout applied to every Qdrant request, in seconds.
    pub qdrant_timeout_secs: u64,
    /// Origins parsed from `ALLOWED_ORIGINS`.
    pub allowed_origins: Vec<String>,
    /// Apply `allowed_origins` instead of the permissive CORS policy.
    pub cors_enforce_allowlist: bool,
    /// Interface the HTTP server binds to.
    pub server_host: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: load_env("OPENAI_API_KEY")?,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: parse_env_optional("EMBEDDING_DIMENSION")?
                .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            qdrant_url: load_env_optional("QDRANT_URL")
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            qdrant_timeout_secs: parse_env_optional("QDRANT_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_QDRANT_TIMEOUT_SECS),
            allowed_origins: parse_origins(load_env_optional("ALLOWED_ORIGINS").as_deref()),
            cors_enforce_allowlist: load_env_optional("CORS_ENFORCE_ALLOWLIST")
                .map(|value| parse_flag(&value, "CORS_ENFORCE_ALLOWLIST"))
                .transpose()?
                .unwrap_or(false),
            server_host: load_env_optional("SERVER_HOST")
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_env_optional("SERVER_PORT")?.unwrap_or(DEFAULT_SERVER_PORT),
        })
    }

    /// Client-level timeout for Qdrant requests.
    pub fn qdrant_timeout(&self) -> Duration {
        Duration::from_secs(self.qdrant_timeout_secs)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_flag(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Split a comma separated origin list, falling back to the local frontend origin.
pub(crate) fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        vec![DEFAULT_ALLOWED_ORIGIN.to_string()]
    } else {
        origins
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_model = %config.embedding_model,
        embedding_dimension = config.embedding_dimension,
        server_port = config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

/// Build a configuration pointing at local test doubles.
#[cfg(test)]
pub(crate) fn test_config(openai_base_url: &str, qdrant_url: &str, dimension: usize) -> Config {
    Config {
        openai_api_key: "sk-test".into(),
        openai_base_url: openai_base_url.into(),
        embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
        embedding_dimension: dimension,
        qdrant_url: qdrant_url.into(),
        qdrant_api_key: None,
        qdrant_collection_name: DEFAULT_COLLECTION_NAME.into(),
        qdrant_timeout_secs: 5,
        allowed_origins: parse_origins(None),
        cors_enforce_allowlist: false,
        server_host: "127.0.0.1".into(),
        server_port: DEFAULT_SERVER_PORT,
    }
}
