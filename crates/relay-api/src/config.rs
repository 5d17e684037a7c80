//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use relay_core::{Error, LogFormat, Result};
use relay_engine::config::EngineConfig;

/// Configuration for the Relay API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Emit JSON logs instead of the pretty development format.
    pub log_json: bool,

    /// Number of concurrent worker loops.
    pub worker_concurrency: usize,

    /// Worker queue-poll timeout, seconds.
    pub worker_poll_timeout_secs: u64,

    /// Outbound HTTP connect timeout, milliseconds.
    pub delivery_connect_timeout_ms: u64,

    /// Outbound HTTP read timeout, milliseconds.
    pub delivery_read_timeout_ms: u64,

    /// Retry budget applied when a request omits `maxRetries`.
    pub retry_max_retries: u32,

    /// Base of the exponential backoff, seconds.
    pub retry_base_delay_secs: u64,

    /// Period of the retry scheduler's store scan, seconds.
    pub retry_scan_period_secs: u64,

    /// Period of the recovery sweeper, seconds.
    pub sweep_period_secs: u64,

    /// Age after which a PROCESSING claim counts as abandoned, seconds.
    pub stuck_threshold_secs: u64,

    /// Allowed CORS origins. `["*"]` allows all origins (development
    /// only); an empty list disables CORS entirely.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            http_port: 8080,
            log_json: false,
            worker_concurrency: engine.worker_concurrency,
            worker_poll_timeout_secs: engine.poll_timeout.as_secs(),
            delivery_connect_timeout_ms: u64::try_from(engine.connect_timeout.as_millis())
                .unwrap_or(u64::MAX),
            delivery_read_timeout_ms: u64::try_from(engine.read_timeout.as_millis())
                .unwrap_or(u64::MAX),
            retry_max_retries: engine.default_max_retries,
            retry_base_delay_secs: engine.base_delay.as_secs(),
            retry_scan_period_secs: engine.retry_scan_period.as_secs(),
            sweep_period_secs: engine.sweep_period.as_secs(),
            stuck_threshold_secs: engine.stuck_threshold.as_secs(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `RELAY_HTTP_PORT`
    /// - `RELAY_LOG_FORMAT` (`json` | `pretty`)
    /// - `RELAY_WORKER_CONCURRENCY`
    /// - `RELAY_WORKER_POLL_TIMEOUT_SECS`
    /// - `RELAY_DELIVERY_CONNECT_TIMEOUT_MS`
    /// - `RELAY_DELIVERY_READ_TIMEOUT_MS`
    /// - `RELAY_RETRY_MAX_RETRIES` (1-10)
    /// - `RELAY_RETRY_BASE_DELAY_SECS`
    /// - `RELAY_RETRY_SCAN_PERIOD_SECS`
    /// - `RELAY_SWEEP_PERIOD_SECS`
    /// - `RELAY_STUCK_THRESHOLD_SECS`
    /// - `RELAY_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed,
    /// or if a value is out of its documented range.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("RELAY_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(format) = env_string("RELAY_LOG_FORMAT") {
            config.log_json = match format.to_ascii_lowercase().as_str() {
                "json" => true,
                "pretty" => false,
                _ => {
                    return Err(Error::validation(
                        "RELAY_LOG_FORMAT must be one of: json, pretty",
                    ));
                }
            };
        }
        if let Some(concurrency) = env_u64("RELAY_WORKER_CONCURRENCY")? {
            if concurrency == 0 {
                return Err(Error::validation(
                    "RELAY_WORKER_CONCURRENCY must be greater than 0",
                ));
            }
            config.worker_concurrency = usize::try_from(concurrency)
                .map_err(|_| Error::validation("RELAY_WORKER_CONCURRENCY is too large"))?;
        }
        if let Some(secs) = env_u64("RELAY_WORKER_POLL_TIMEOUT_SECS")? {
            config.worker_poll_timeout_secs = secs;
        }
        if let Some(ms) = env_u64("RELAY_DELIVERY_CONNECT_TIMEOUT_MS")? {
            config.delivery_connect_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("RELAY_DELIVERY_READ_TIMEOUT_MS")? {
            config.delivery_read_timeout_ms = ms;
        }
        if let Some(retries) = env_u32("RELAY_RETRY_MAX_RETRIES")? {
            if !(1..=10).contains(&retries) {
                return Err(Error::validation(
                    "RELAY_RETRY_MAX_RETRIES must be between 1 and 10",
                ));
            }
            config.retry_max_retries = retries;
        }
        if let Some(secs) = env_u64("RELAY_RETRY_BASE_DELAY_SECS")? {
            config.retry_base_delay_secs = secs;
        }
        if let Some(secs) = env_u64("RELAY_RETRY_SCAN_PERIOD_SECS")? {
            config.retry_scan_period_secs = secs;
        }
        if let Some(secs) = env_u64("RELAY_SWEEP_PERIOD_SECS")? {
            config.sweep_period_secs = secs;
        }
        if let Some(secs) = env_u64("RELAY_STUCK_THRESHOLD_SECS")? {
            config.stuck_threshold_secs = secs;
        }
        if let Some(origins) = env_string("RELAY_CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = parse_cors_allowed_origins(&origins);
        }

        Ok(config)
    }

    /// Returns the log format chosen by the configuration.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    /// Converts the flat settings into the engine's typed configuration.
    #[must_use]
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            worker_concurrency: self.worker_concurrency,
            poll_timeout: Duration::from_secs(self.worker_poll_timeout_secs),
            connect_timeout: Duration::from_millis(self.delivery_connect_timeout_ms),
            read_timeout: Duration::from_millis(self.delivery_read_timeout_ms),
            default_max_retries: self.retry_max_retries,
            base_delay: Duration::from_secs(self.retry_base_delay_secs),
            retry_scan_period: Duration::from_secs(self.retry_scan_period_secs),
            sweep_period: Duration::from_secs(self.sweep_period_secs),
            stuck_threshold: Duration::from_secs(self.stuck_threshold_secs),
            ..EngineConfig::default()
        }
    }
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::validation(format!("{name} must be a u16: {e}")))
}

fn env_u32(name: &str) -> Result<Option<u32>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u32>()
        .map(Some)
        .map_err(|e| Error::validation(format!("{name} must be a u32: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::validation(format!("{name} must be a u64: {e}")))
}
