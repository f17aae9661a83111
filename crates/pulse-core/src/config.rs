use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_UPSTREAM_HOST: &str = "datagen";
pub const DEFAULT_UPSTREAM_PORT: u16 = 9000;
pub const DEFAULT_BUFFER_CAPACITY: usize = 30 * 100; // 30 s of history at 100 Hz
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 1024; // frames queued per WS client
pub const DEFAULT_CONFIG_PATH: &str = "pulse.toml";
pub const ENV_PREFIX: &str = "PULSE_";

/// Top-level config (pulse.toml + PULSE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// HTTP/WS listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// The single TCP producer the ingest loop connects to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_host")]
    pub host: String,
    #[serde(default = "default_upstream_port")]
    pub port: u16,
}

impl UpstreamConfig {
    /// `host:port` string suitable for `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: default_upstream_host(),
            port: default_upstream_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Number of most recent samples kept for catch-up.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// What a timed broadcast tick does with the pending sample.
    #[serde(default)]
    pub pending_policy: PendingPolicy,
    /// Bounded queue length between the relay and each WS connection.
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            pending_policy: PendingPolicy::default(),
            subscriber_queue: default_subscriber_queue(),
        }
    }
}

/// Timed-mode behaviour after a tick has broadcast the pending sample.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PendingPolicy {
    /// Keep the sample; the next tick re-sends it if nothing newer arrived.
    #[default]
    Retain,
    /// Consume the sample; quiet ticks send nothing.
    Clear,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty mirrors any request origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_upstream_host() -> String {
    DEFAULT_UPSTREAM_HOST.to_string()
}
fn default_upstream_port() -> u16 {
    DEFAULT_UPSTREAM_PORT
}
fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}
fn default_subscriber_queue() -> usize {
    DEFAULT_SUBSCRIBER_QUEUE
}

impl PulseConfig {
    /// Load config from a TOML file with PULSE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. PULSE_CONFIG env var
    ///   3. ./pulse.toml
    ///
    /// A missing file is fine; every field has a default.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("PULSE_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        tracing::debug!(%path, "loading config");
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__")),
        )
    }

    /// Extract and validate from an already assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: PulseConfig = figment
            .extract()
            .map_err(|e| PulseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.relay.buffer_capacity == 0 {
            return Err(PulseError::Config(
                "relay.buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.relay.subscriber_queue == 0 {
            return Err(PulseError::Config(
                "relay.subscriber_queue must be at least 1".to_string(),
            ));
        }
        if self.upstream.host.trim().is_empty() {
            return Err(PulseError::Config("upstream.host is empty".to_string()));
        }
        Ok(())
    }
}
