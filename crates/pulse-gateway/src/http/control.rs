//! Broadcast mode control, POST /broadcast_interval.
//!
//! Body: `{ "interval": <ms> }`. `0` broadcasts every sample as it arrives;
//! anything larger broadcasts only the latest sample once per interval.
//!
//! Response: `200 { "message": "Parameter received", "interval": <body> }`,
//! or `400 { "error": "..." }` with no change to the broadcast mode.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use pulse_protocol::{ErrorBody, IntervalAck, IntervalRequest};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

pub async fn broadcast_interval_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IntervalAck>, (StatusCode, Json<ErrorBody>)> {
    let request = IntervalRequest::parse(&body).map_err(|e| {
        warn!(error = %e, bytes = body.len(), "rejected broadcast interval request");
        (StatusCode::BAD_REQUEST, Json(ErrorBody::from(&e)))
    })?;

    info!(interval_ms = request.interval_ms, "broadcast interval requested");
    state.relay.set_interval(request.interval_ms).await;

    Ok(Json(IntervalAck::new(request)))
}
