use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;

/// Axum handler: upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection loop, alive for the entire WS session.
///
/// The relay pushes serialized frames into a bounded queue (sync first, then
/// appends); this loop forwards them to the socket and watches the socket for
/// closure. Whatever ends the loop, the subscriber is unregistered.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let (queue_tx, mut queue) = mpsc::channel::<String>(state.config.relay.subscriber_queue);
    let sub_id = match state.relay.register(Box::new(queue_tx)) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "could not register WS subscriber");
            return;
        }
    };
    info!(sub_id = %sub_id, "WebSocket connection established");

    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            frame = queue.recv() => {
                let Some(text) = frame else { break };
                if let Err(e) = tx.send(Message::Text(text.into())).await {
                    debug!(sub_id = %sub_id, error = %e, "WS send failed");
                    break;
                }
            }

            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(sub_id = %sub_id, error = %e, "WebSocket error");
                        break;
                    }
                    // subscribers have nothing to say; inbound frames are ignored
                    Some(Ok(_)) => {}
                }
            }

            _ = state.closing.cancelled() => {
                let _ = tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.relay.unregister(sub_id);
    let _ = tx.close().await;
    info!(sub_id = %sub_id, "WebSocket connection closed");
}
