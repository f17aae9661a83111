use clap::Parser;
use pulse_core::PulseConfig;

/// Relay a TCP telemetry feed to WebSocket subscribers.
///
/// Flags override pulse.toml and PULSE_* environment variables.
#[derive(Debug, Parser)]
#[command(name = "pulse-gateway", version)]
pub struct Cli {
    /// Config file (default: $PULSE_CONFIG, then ./pulse.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen address for HTTP and WebSocket
    #[arg(long)]
    pub bind: Option<String>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Upstream producer host
    #[arg(long)]
    pub upstream_host: Option<String>,

    /// Upstream producer port
    #[arg(long)]
    pub upstream_port: Option<u16>,

    /// Samples kept for catch-up
    #[arg(long)]
    pub buffer_capacity: Option<usize>,
}

impl Cli {
    pub fn apply(&self, config: &mut PulseConfig) {
        if let Some(ref bind) = self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref host) = self.upstream_host {
            config.upstream.host = host.clone();
        }
        if let Some(port) = self.upstream_port {
            config.upstream.port = port;
        }
        if let Some(capacity) = self.buffer_capacity {
            config.relay.buffer_capacity = capacity;
        }
    }
}
