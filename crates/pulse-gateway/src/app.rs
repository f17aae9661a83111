use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use pulse_core::config::{CorsConfig, PulseConfig};
use pulse_relay::{ingest, Relay, TaskHandle};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Central shared state (passed as Arc<AppState> to all Axum handlers).
pub struct AppState {
    pub config: PulseConfig,
    pub relay: Arc<Relay>,
    pub started_at: DateTime<Utc>,
    /// Fired once on process shutdown; open WS connections close on it.
    pub closing: CancellationToken,
    /// Upstream ingest loop. tokio::sync::Mutex because stopping it awaits.
    ingest: tokio::sync::Mutex<Option<TaskHandle>>,
}

impl AppState {
    pub fn new(config: PulseConfig, relay: Arc<Relay>) -> Self {
        Self {
            config,
            relay,
            started_at: Utc::now(),
            closing: CancellationToken::new(),
            ingest: tokio::sync::Mutex::new(None),
        }
    }

    /// Spawn the ingest loop against the configured upstream. A loop that is
    /// still running is stopped first.
    pub async fn start_ingest(&self) {
        let mut slot = self.ingest.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop().await;
        }
        let addr = self.config.upstream.addr();
        *slot = Some(ingest::spawn(Arc::clone(&self.relay), addr));
    }

    pub async fn ingest_running(&self) -> bool {
        self.ingest
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Close WS connections, then stop the ingest loop and the broadcast
    /// timer, awaiting each before moving on.
    pub async fn shutdown(&self) {
        self.closing.cancel();
        let ingest = self.ingest.lock().await.take();
        if let Some(handle) = ingest {
            handle.stop().await;
        }
        self.relay.shutdown().await;
        info!("shutdown complete");
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route(
            "/broadcast_interval",
            post(crate::http::control::broadcast_interval_handler),
        )
        .with_state(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Empty origin list: mirror whatever origin asks, credentials allowed.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
