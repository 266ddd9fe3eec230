//! Cross-instance fan-out over Redis pub/sub.
//!
//! Every push is published to the recipient's `user:{id}` channel wrapped in
//! a frame carrying the publishing instance's id; the listener on each
//! instance forwards foreign frames into its local registry and skips its
//! own (the local registry was already pushed directly).

use axum::extract::ws::Message;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::websocket::RoomRegistry;

static INSTANCE_ID: Lazy<Uuid> = Lazy::new(Uuid::new_v4);

#[derive(Debug, Serialize, Deserialize)]
struct PubSubFrame {
    origin: Uuid,
    payload: String,
}

fn channel_for_user(id: Uuid) -> String {
    format!("user:{}", id)
}

pub async fn publish(client: &redis::Client, user_id: Uuid, payload: &str) -> redis::RedisResult<()> {
    let frame = serde_json::to_string(&PubSubFrame {
        origin: *INSTANCE_ID,
        payload: payload.to_string(),
    })
    .map_err(|e| redis::RedisError::from((redis::ErrorKind::TypeError, "frame encode", e.to_string())))?;

    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.publish::<_, _, ()>(channel_for_user(user_id), frame).await
}

/// Forward pushes published by other instances into the local registry.
/// PubSub needs a dedicated connection, not the multiplexed one.
pub async fn start_psub_listener(
    client: redis::Client,
    registry: RoomRegistry,
) -> redis::RedisResult<()> {
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("user:*").await?;
    let mut stream = pubsub.on_message();

    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let raw: String = msg.get_payload()?;
        let Some(id_part) = channel.strip_prefix("user:") else {
            continue;
        };
        let Ok(user_id) = Uuid::parse_str(id_part) else {
            continue;
        };
        match serde_json::from_str::<PubSubFrame>(&raw) {
            Ok(frame) if frame.origin != *INSTANCE_ID => {
                registry.push(user_id, Message::Text(frame.payload)).await;
            }
            Ok(_) => {} // our own publish; already delivered locally
            Err(err) => {
                tracing::warn!(error = %err, %channel, "malformed pubsub frame");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_naming() {
        let id = Uuid::new_v4();
        assert_eq!(channel_for_user(id), format!("user:{id}"));
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = PubSubFrame {
            origin: *INSTANCE_ID,
            payload: r#"{"type":"messages_read"}"#.into(),
        };
        let encoded = serde_json::to_string(&frame).unwrap();
        let decoded: PubSubFrame = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.origin, *INSTANCE_ID);
        assert_eq!(decoded.payload, frame.payload);
    }
}
