//! WebSocket namespace behind the same authentication layer.
//!
//! The upgrade request passes through `authenticate` like any other request,
//! so session renewal cookies ride on the 101 response.

use axum::{
    Router,
    extract::{
        WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::auth::{Auth, Identity};

/// Messages sent from server to client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established with the resolved identity
    Connected { identity: Identity },
    /// Ping to keep connection alive
    Ping,
}

pub fn router() -> Router {
    Router::new().route("/", get(ws_handler))
}

async fn ws_handler(
    Auth(identity): Auth,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Expected WebSocket upgrade").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, identity))
}

async fn handle_socket(socket: WebSocket, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();

    let connected_msg = ServerMessage::Connected {
        identity: identity.clone(),
    };
    if let Ok(json) = serde_json::to_string(&connected_msg) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut ping_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            if tx.send(ServerMessage::Ping).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Whichever task finishes first means the connection is gone
    tokio::select! {
        _ = &mut send_task => {},
        _ = &mut recv_task => {},
        _ = &mut ping_task => {},
    }

    send_task.abort();
    recv_task.abort();
    ping_task.abort();

    info!(user = ?identity.get("user"), "WebSocket disconnected");
}
