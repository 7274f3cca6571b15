//! Relay Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development. Provider lists are ordered:
//! the order here is the order the chain attempts them in.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Outbound HTTP behaviour
    pub http: HttpConfig,

    /// Media resolution providers
    pub media: MediaConfig,

    /// Identity lookup providers and extraction tuning
    pub identity: IdentityConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.media.platform_markers.is_empty() {
            return Err(ConfigError::MissingRequired("media.platform_markers".to_string()));
        }
        if self.media.providers.is_empty() {
            return Err(ConfigError::MissingRequired("media.providers".to_string()));
        }
        if self.identity.providers.is_empty() {
            return Err(ConfigError::MissingRequired("identity.providers".to_string()));
        }
        if self.identity.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "identity.window_size".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("API_PORT")? {
            self.server.port = port;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = split_list(&origins);
        }

        // Outbound HTTP
        if let Some(secs) = env_parse("HTTP_TIMEOUT_SECS")? {
            self.http.timeout_secs = secs;
        }
        if let Some(delay) = env_parse("INTER_ATTEMPT_DELAY_MS")? {
            self.http.inter_attempt_delay_ms = delay;
        }
        if let Ok(agent) = std::env::var("HTTP_USER_AGENT") {
            self.http.user_agent = agent;
        }

        // Media
        if let Ok(markers) = std::env::var("MEDIA_PLATFORM_MARKERS") {
            self.media.platform_markers = split_list(&markers);
        }

        // Identity
        if let Some(window) = env_parse("IDENTITY_WINDOW_SIZE")? {
            self.identity.window_size = window;
        }
        if let Some(dedupe) = env_parse("IDENTITY_DEDUPE_RECORDS")? {
            self.identity.dedupe_records = dedupe;
        }
        if let Some(count) = env_parse("IDENTITY_COUNT_EXPLICIT_MENTIONS")? {
            self.identity.count_explicit_mentions = count;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent sent to providers
    pub user_agent: String,

    /// Pause between two provider attempts
    pub inter_attempt_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            inter_attempt_delay_ms: 250,
        }
    }
}

/// How the search term is sent to a provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RequestShape {
    /// GET with `{query}` substituted into the endpoint
    #[default]
    Get,
    /// POST `application/x-www-form-urlencoded` with the term in `field`
    Form { field: String },
    /// POST JSON object with the term in `field`
    Json { field: String },
}

/// One configured upstream provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Name used in logs and diagnostics
    pub name: String,

    /// Endpoint URL, may contain `{query}`
    pub endpoint: String,

    /// Request shape
    #[serde(default)]
    pub request: RequestShape,

    /// Response adapter identifier
    pub adapter: String,
}

impl ProviderEntry {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        request: RequestShape,
        adapter: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            request,
            adapter: adapter.into(),
        }
    }
}

/// Media resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Domain markers a reference must contain
    pub platform_markers: Vec<String>,

    /// Providers in attempt order
    pub providers: Vec<ProviderEntry>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            platform_markers: vec!["tiktok.com".to_string()],
            providers: vec![
                ProviderEntry::new(
                    "tikwm",
                    "https://www.tikwm.com/api/?url={query}&hd=1",
                    RequestShape::Get,
                    "tikwm",
                ),
                ProviderEntry::new(
                    "tiklydown",
                    "https://api.tiklydown.eu.org/api/download?url={query}",
                    RequestShape::Get,
                    "tiklydown",
                ),
                ProviderEntry::new(
                    "lovetik",
                    "https://lovetik.com/api/ajax/search",
                    RequestShape::Form {
                        field: "query".to_string(),
                    },
                    "lovetik",
                ),
            ],
        }
    }
}

/// Identity lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Providers in attempt order
    pub providers: Vec<ProviderEntry>,

    /// Characters of context inspected around each number
    pub window_size: usize,

    /// Collapse repeated numbers into one record
    pub dedupe_records: bool,

    /// Add "Network: N" style mentions on top of per-record counts
    pub count_explicit_mentions: bool,

    /// Address label variants, highest priority first
    pub address_labels: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderEntry::new(
                    "simdb-primary",
                    "https://simdb-primary.example/search",
                    RequestShape::Form {
                        field: "search".to_string(),
                    },
                    "markup",
                ),
                ProviderEntry::new(
                    "simdb-mirror",
                    "https://simdb-mirror.example/lookup?q={query}",
                    RequestShape::Get,
                    "markup",
                ),
            ],
            window_size: 200,
            dedupe_records: false,
            count_explicit_mentions: true,
            address_labels: vec![
                "Address".to_string(),
                "Residential Address".to_string(),
                "Permanent Address".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::RelayError {
    fn from(err: ConfigError) -> Self {
        crate::RelayError::Config(err.to_string())
    }
}
