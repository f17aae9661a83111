use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns relay state.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.relay.status();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "mode": status.mode,
        "buffered": status.buffered,
        "capacity": status.capacity,
        "subscribers": status.subscribers,
        "ingest_running": state.ingest_running().await,
    }))
}
