//! Dashboard WebSocket endpoint
//!
//! One-way state feed: every client gets the current snapshot on connect and
//! every broadcast afterwards. Clients send nothing but pong frames; all
//! mutations go through the REST endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use deskglow_domain::constants::HEARTBEAT_INTERVAL_SECS;
use deskglow_domain::StateSnapshot;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::context::AppContext;

pub async fn ws_handler(
    State(ctx): State<Arc<AppContext>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<AppContext>) {
    let mut rx = ctx.reconciler.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Initial snapshot so a freshly connected dashboard renders immediately
    let snapshot = ctx.reconciler.snapshot().await;
    if send_snapshot(&mut sender, &snapshot).await.is_err() {
        return;
    }

    let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.tick().await; // first tick completes immediately
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(snapshot) => {
                    if send_snapshot(&mut sender, &snapshot).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // Catch the slow client up with a fresh snapshot
                    warn!(missed, "WebSocket client lagged behind broadcasts");
                    let snapshot = ctx.reconciler.snapshot().await;
                    if send_snapshot(&mut sender, &snapshot).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            _ = heartbeat.tick() => {
                if awaiting_pong {
                    debug!("WebSocket client missed heartbeat; closing");
                    break;
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Pong(_))) => awaiting_pong = false,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {} // state feed is one-way; ignore client data
            }
        }
    }

    debug!("WebSocket client disconnected");
}

async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    snapshot: &StateSnapshot,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(snapshot) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "Failed to serialize state snapshot");
            return Ok(());
        }
    };
    sender.send(Message::Text(payload.into())).await
}
