use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::error::AppError;
use crate::middleware::{auth, guards::User};
use crate::state::AppState;
use crate::websocket::message_types::WsInboundEvent;

/// How long a fresh connection may idle before announcing its room.
const JOIN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Browsers cannot set headers on a socket handshake, so the token arrives
/// as a query parameter; the Authorization header is accepted as well.
fn authenticate(params: &WsParams, headers: &HeaderMap, secret: &str) -> Result<User, AppError> {
    let token = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });

    match token {
        Some(token) => auth::verify_token(&token, secret),
        None => Err(AppError::Unauthorized),
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let user = match authenticate(&params, &headers, &state.config.jwt_secret) {
        Ok(user) => user,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

/// Wait for the client's `join_room` announce. Unknown frames before the
/// announce are ignored; close or timeout aborts the connection.
async fn wait_for_join(socket: &mut WebSocket) -> Option<uuid::Uuid> {
    let deadline = tokio::time::sleep(JOIN_DEADLINE);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return None,
            frame = socket.recv() => match frame {
                Some(Ok(Message::Text(txt))) => {
                    if let Ok(WsInboundEvent::JoinRoom { user_id }) = serde_json::from_str(&txt) {
                        return Some(user_id);
                    }
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => {}
                Some(Err(_)) => return None,
            },
        }
    }
}

async fn handle_socket(state: AppState, user: User, mut socket: WebSocket) {
    // No automatic enrollment: the client must announce its own room, and
    // the announce must match the authenticated identity.
    match wait_for_join(&mut socket).await {
        Some(announced) if announced == user.id => {}
        Some(announced) => {
            warn!(%announced, authenticated = %user.id, "join_room identity mismatch");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        None => {
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }

    let mut rx = state.registry.join(user.id).await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(msg) => {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                // Push-only gateway: inbound frames never mutate state. A
                // repeated join for the same room is harmless; anything else
                // is dropped.
                Some(Ok(Message::Text(txt))) => {
                    match serde_json::from_str::<WsInboundEvent>(&txt) {
                        Ok(WsInboundEvent::JoinRoom { user_id }) if user_id == user.id => {}
                        _ => warn!(user_id = %user.id, "ignoring unexpected socket frame"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
}
