//! Configuration for the Runcast Server
//!
//! This module contains the configuration types and loading functionality.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Public origin prefixed to asset URLs handed to flows
    #[serde(default)]
    pub base_url: Option<String>,

    /// Path the flow routes are mounted under
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Asset storage location, `memory://...` or `file://<dir>`
    #[serde(default = "default_asset_store_url")]
    pub asset_store_url: String,

    /// Directory for per-run error logs, tracing only when unset
    #[serde(default)]
    pub run_log_dir: Option<String>,

    /// Seconds a finished run stays registered, `None` keeps runs forever
    #[serde(default = "default_run_retention_secs")]
    pub run_retention_secs: Option<u64>,

    /// Seconds between eviction sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Interval of SSE keep-alive comments, `None` disables them
    #[serde(default = "default_sse_keep_alive_secs")]
    pub sse_keep_alive_secs: Option<u64>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format, `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_port() -> u16 {
    3001
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_path() -> String {
    "/flow".to_string()
}

fn default_asset_store_url() -> String {
    "memory://local".to_string()
}

fn default_run_retention_secs() -> Option<u64> {
    Some(3600) // 1 hour
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sse_keep_alive_secs() -> Option<u64> {
    Some(15)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Parse a seconds value where `none` means disabled
fn parse_optional_secs(name: &str, value: &str) -> Option<Option<u64>> {
    if value.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    match value.parse::<u64>() {
        Ok(secs) => Some(Some(secs)),
        Err(_) => {
            warn!("Invalid {} value: {}", name, value);
            None
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and an optional `.env` file
    pub fn load() -> ServerResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        // Start with defaults
        let mut config = Self::default();

        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.port = port;
            } else {
                warn!("Invalid SERVER_PORT value: {}", port);
            }
        }

        if let Ok(host) = env::var("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Ok(base_url) = env::var("BASE_URL") {
            config.base_url = Some(base_url);
        }

        if let Ok(base_path) = env::var("FLOW_BASE_PATH") {
            config.base_path = base_path;
        }

        if let Ok(asset_store_url) = env::var("ASSET_STORE_URL") {
            config.asset_store_url = asset_store_url;
        }

        if let Ok(run_log_dir) = env::var("RUN_LOG_DIR") {
            config.run_log_dir = Some(run_log_dir);
        }

        if let Ok(retention) = env::var("RUN_RETENTION_SECS") {
            if let Some(retention) = parse_optional_secs("RUN_RETENTION_SECS", &retention) {
                config.run_retention_secs = retention;
            }
        }

        if let Ok(interval) = env::var("RUN_SWEEP_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse::<u64>() {
                config.sweep_interval_secs = interval;
            } else {
                warn!("Invalid RUN_SWEEP_INTERVAL_SECS value: {}", interval);
            }
        }

        if let Ok(keep_alive) = env::var("SSE_KEEP_ALIVE_SECS") {
            if let Some(keep_alive) = parse_optional_secs("SSE_KEEP_ALIVE_SECS", &keep_alive) {
                config.sse_keep_alive_secs = keep_alive;
            }
        }

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Ok(log_format) = env::var("LOG_FORMAT") {
            config.log_format = log_format.to_lowercase();
        }

        config.validate()?;

        if config.run_retention_secs.is_none() {
            warn!("RUN_RETENTION_SECS is none - finished runs are never evicted!");
        }

        info!("Loaded server configuration");
        Ok(config)
    }

    /// Check values that cannot be used
    pub fn validate(&self) -> ServerResult<()> {
        if self.sweep_interval_secs == 0 {
            return Err(ServerError::ConfigError(
                "Run sweep interval must be greater than zero".to_string(),
            ));
        }

        if self.sse_keep_alive_secs == Some(0) {
            return Err(ServerError::ConfigError(
                "SSE keep-alive interval must be greater than zero".to_string(),
            ));
        }

        if self.log_format != "text" && self.log_format != "json" {
            return Err(ServerError::ConfigError(format!(
                "Unsupported log format: {}",
                self.log_format
            )));
        }

        if !self.asset_store_url.starts_with("memory://")
            && !self.asset_store_url.starts_with("file://")
        {
            return Err(ServerError::ConfigError(format!(
                "Unsupported asset store URL: {}",
                self.asset_store_url
            )));
        }

        Ok(())
    }

    /// Retention of finished runs
    pub fn run_retention(&self) -> Option<Duration> {
        self.run_retention_secs.map(Duration::from_secs)
    }

    /// Interval between eviction sweeps
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Interval of SSE keep-alive comments
    pub fn sse_keep_alive(&self) -> Option<Duration> {
        self.sse_keep_alive_secs.map(Duration::from_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            base_url: None,
            base_path: default_base_path(),
            asset_store_url: default_asset_store_url(),
            run_log_dir: None,
            run_retention_secs: default_run_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sse_keep_alive_secs: default_sse_keep_alive_secs(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}
