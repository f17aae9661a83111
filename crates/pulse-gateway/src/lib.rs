//! `pulse-gateway`: HTTP/WebSocket front of the telemetry relay.
//!
//! Routes:
//!   GET  /ws                  subscriber stream (sync, then appends)
//!   POST /broadcast_interval  switch immediate/timed broadcasting
//!   GET  /health              relay status

pub mod app;
pub mod cli;
pub mod http;
pub mod ws;

pub use app::{build_router, AppState};
