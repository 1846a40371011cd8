use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, error};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// HS256 secret used to validate bearer credentials
    pub auth_jwt_secret: Option<String>,

    /// Envelopes queued per session before new ones are dropped for it
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Idle lifetime of a cached validated identity
    #[serde(default = "default_identity_cache_ttl_secs")]
    pub identity_cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed list of allowed CORS origins. Empty means any origin.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn identity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_cache_ttl_secs)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Tracing filter used when `RUST_LOG` is unset. Request tracing is only
    /// verbose in development.
    pub fn log_filter(&self) -> String {
        let http_level = if self.is_development() { "debug" } else { "info" };
        format!(
            "collab_sync={},tower_http={},axum::rejection=trace,info",
            self.log_level, http_level
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            service_name: default_service_name(),
            auth_jwt_secret: None,
            broadcast_capacity: default_broadcast_capacity(),
            identity_cache_ttl_secs: default_identity_cache_ttl_secs(),
        }
    }
}

/// Client-side session timing, loaded from `SYNC_*` environment variables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Base url of the sync server, e.g. `ws://localhost:3000`
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Quiescence window before a coalesced `content_update` is broadcast
    #[serde(default = "default_broadcast_debounce_ms")]
    pub broadcast_debounce_ms: u64,

    /// Quiescence window before coalesced content is persisted
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,

    /// Fixed delay between a channel closing and the reopen attempt
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_autosave")]
    pub autosave: bool,
}

impl SessionConfig {
    pub fn load() -> Result<Self, ConfigError> {
        envy::prefixed("SYNC_")
            .from_env::<SessionConfig>()
            .map_err(ConfigError::EnvError)
    }

    pub fn broadcast_window(&self) -> Duration {
        Duration::from_millis(self.broadcast_debounce_ms)
    }

    pub fn autosave_window(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            broadcast_debounce_ms: default_broadcast_debounce_ms(),
            autosave_debounce_ms: default_autosave_debounce_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            autosave: default_autosave(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "collab-sync".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_broadcast_capacity() -> usize {
    100
}

fn default_identity_cache_ttl_secs() -> u64 {
    300
}

fn default_server_url() -> String {
    "ws://localhost:3000".to_string()
}

fn default_broadcast_debounce_ms() -> u64 {
    1000
}

fn default_autosave_debounce_ms() -> u64 {
    2000
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_autosave() -> bool {
    true
}
