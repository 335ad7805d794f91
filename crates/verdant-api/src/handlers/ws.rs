//! WebSocket upgrade handler: the live transport behind the lifecycle manager.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use verdant_realtime::connection::authenticator::AuthenticatedConnection;
use verdant_realtime::connection::heartbeat::run_heartbeat;
use verdant_realtime::message::types::OutboundMessage;

use crate::state::AppState;

/// Query parameters accepted at upgrade.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token. Missing or invalid tokens connect anonymously.
    pub token: Option<String>,
    /// Optional location tag, e.g. `greenhouse`.
    pub location: Option<String>,
}

/// GET /ws?token={jwt}&location={tag}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    let identity = state
        .realtime
        .authenticator
        .authenticate(query.token.as_deref());
    let location = query.location.filter(|l| !l.trim().is_empty());

    ws.on_upgrade(move |socket| handle_socket(state, identity, location, socket))
}

async fn handle_socket(
    state: AppState,
    identity: Option<AuthenticatedConnection>,
    location: Option<String>,
    socket: WebSocket,
) {
    let connections = state.realtime.connections.clone();
    let (handle, mut outbound_rx) = connections.on_connect(identity, location);
    let conn_id = handle.id;

    handle
        .send_message(&OutboundMessage::Connected {
            connection_id: conn_id,
            authenticated: handle.is_authenticated(),
            timestamp: Utc::now(),
        })
        .await;

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = {
        let handle = handle.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = handle.closed() => break,
                    next = outbound_rx.recv() => {
                        let Some(text) = next else { break };
                        if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                            debug!(conn_id = %handle.id, error = %e, "Socket write failed");
                            handle.mark_dead();
                            break;
                        }
                    }
                }
            }
            let _ = ws_tx.send(Message::Close(None)).await;
        })
    };

    let heartbeat = tokio::spawn(run_heartbeat(handle.clone(), connections.heartbeat_config()));

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    connections.handle_inbound(&conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    connections.on_disconnect(&conn_id);
    heartbeat.abort();
    if let Err(e) = writer.await {
        debug!(conn_id = %conn_id, error = %e, "Socket writer ended abnormally");
    }
}
