use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::connection::{ConnectionSettings, ReconnectPolicy};

/// Prefix of environment overrides, e.g. `MEETING_STREAM_STREAM__ENDPOINT`
pub const ENV_PREFIX: &str = "MEETING_STREAM";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub stream: StreamConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

/// Bind address of the viewer API
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// WebSocket URL of the streaming endpoint
    pub endpoint: String,

    #[serde(default = "default_liveness_window_secs")]
    pub liveness_window_secs: u64,

    #[serde(default = "default_heartbeat_echo_interval_secs")]
    pub heartbeat_echo_interval_secs: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the session-management REST API
    pub base_url: String,
}

fn default_liveness_window_secs() -> u64 {
    60
}

fn default_heartbeat_echo_interval_secs() -> u64 {
    10
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_attempts: 5,
        }
    }
}

impl Config {
    /// Load `path` (extension optional) and apply environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.http.port == 0 {
            bail!("service.http.port cannot be 0");
        }
        if self.stream.endpoint.trim().is_empty() {
            bail!("stream.endpoint must be set");
        }
        if self.stream.liveness_window_secs == 0 {
            bail!("stream.liveness_window_secs must be greater than 0");
        }
        if self.stream.reconnect.max_attempts == 0 {
            bail!("stream.reconnect.max_attempts must be greater than 0");
        }
        if self.stream.reconnect.base_delay_ms == 0 {
            bail!("stream.reconnect.base_delay_ms must be greater than 0");
        }
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must be set");
        }
        Ok(())
    }
}

impl StreamConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect.base_delay_ms),
            self.reconnect.max_attempts,
        )
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            liveness_window: Duration::from_secs(self.liveness_window_secs),
            heartbeat_echo_interval: Duration::from_secs(self.heartbeat_echo_interval_secs),
            reconnect: self.reconnect_policy(),
        }
    }
}
