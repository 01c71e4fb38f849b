//! Configuration for the marketplace integration layer.
//!
//! Loaded in priority order: environment variables over `config.toml`
//! over built-in defaults. The service works out of the box with
//! production-ready defaults; the file and environment exist for
//! deployment-specific overrides.

use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchConfig;

const CONFIG_FILE: &str = "config.toml";

/// Complete marketplace configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// In-flight request ceiling.
    ///
    /// Environment variable: `MAX_CONCURRENT_REQUESTS`
    #[serde(default = "default_max_concurrent", alias = "MAX_CONCURRENT_REQUESTS")]
    pub max_concurrent_requests: usize,

    /// Retry budget per integration event.
    ///
    /// Environment variable: `EVENT_MAX_RETRIES`
    #[serde(default = "default_event_max_retries", alias = "EVENT_MAX_RETRIES")]
    pub event_max_retries: u32,

    /// Maximum queued events per `(source, priority)` lane.
    ///
    /// Environment variable: `EVENT_QUEUE_CAPACITY`
    #[serde(default = "default_queue_capacity", alias = "EVENT_QUEUE_CAPACITY")]
    pub event_queue_capacity: usize,

    /// Seconds between queue drains.
    ///
    /// Environment variable: `EVENT_DRAIN_INTERVAL_SECONDS`
    #[serde(default = "default_drain_interval", alias = "EVENT_DRAIN_INTERVAL_SECONDS")]
    pub event_drain_interval_seconds: u64,

    /// Base delay of the event retry backoff in milliseconds.
    ///
    /// Environment variable: `EVENT_RETRY_BASE_DELAY_MS`
    #[serde(default = "default_retry_base_delay_ms", alias = "EVENT_RETRY_BASE_DELAY_MS")]
    pub event_retry_base_delay_ms: u64,

    /// Jitter factor for retry timing (0.0 to 1.0).
    ///
    /// Environment variable: `EVENT_RETRY_JITTER_FACTOR`
    #[serde(default = "default_jitter_factor", alias = "EVENT_RETRY_JITTER_FACTOR")]
    pub event_retry_jitter_factor: f64,

    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl MarketplaceConfig {
    /// Loads configuration from defaults, file, and environment.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Converts to the dispatcher's configuration type.
    pub fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            max_retries: self.event_max_retries,
            queue_capacity: self.event_queue_capacity,
            drain_interval: Duration::from_secs(self.event_drain_interval_seconds),
            retry_base_delay: Duration::from_millis(self.event_retry_base_delay_ms),
            jitter_factor: self.event_retry_jitter_factor,
        }
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            anyhow::bail!("max_concurrent_requests must be greater than 0");
        }
        if self.event_queue_capacity == 0 {
            anyhow::bail!("event_queue_capacity must be greater than 0");
        }
        if self.event_drain_interval_seconds == 0 {
            anyhow::bail!("event_drain_interval_seconds must be greater than 0");
        }
        if self.event_retry_base_delay_ms == 0 {
            anyhow::bail!("event_retry_base_delay_ms must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.event_retry_jitter_factor) {
            anyhow::bail!("event_retry_jitter_factor must be between 0.0 and 1.0");
        }
        Ok(())
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            event_max_retries: default_event_max_retries(),
            event_queue_capacity: default_queue_capacity(),
            event_drain_interval_seconds: default_drain_interval(),
            event_retry_base_delay_ms: default_retry_base_delay_ms(),
            event_retry_jitter_factor: default_jitter_factor(),
            rust_log: default_log_level(),
        }
    }
}

fn default_max_concurrent() -> usize {
    crate::DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_event_max_retries() -> u32 {
    3
}

fn default_queue_capacity() -> usize {
    256
}

fn default_drain_interval() -> u64 {
    30
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_jitter_factor() -> f64 {
    0.0
}

fn default_log_level() -> String {
    "info".to_string()
}
