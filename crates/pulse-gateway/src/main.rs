use clap::Parser;
use pulse_core::PulseConfig;
use pulse_gateway::{app, cli::Cli};
use pulse_relay::Relay;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pulse_gateway=info,pulse_relay=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > PULSE_CONFIG env > ./pulse.toml
    let mut config = PulseConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        PulseConfig::default()
    });
    cli.apply(&mut config);
    config.validate()?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    info!(
        upstream = %config.upstream.addr(),
        capacity = config.relay.buffer_capacity,
        policy = ?config.relay.pending_policy,
        "relay configured"
    );

    let relay = Arc::new(Relay::new(&config.relay)?);
    let state = Arc::new(app::AppState::new(config, relay));
    state.start_ingest().await;

    let router = app::build_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("pulse gateway listening on {}", addr);

    let closing = state.closing.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown requested");
            // lets open WS connections finish so serve can return
            closing.cancel();
        })
        .await?;

    state.shutdown().await;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
