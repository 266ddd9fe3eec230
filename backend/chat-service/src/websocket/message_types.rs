use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames a client may send. The gateway is push-only: nothing here mutates
/// durable state; every mutation goes through the REST surface.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    /// Announce which room this connection belongs to. Must match the
    /// authenticated identity; sent once, immediately after connecting.
    #[serde(rename = "join_room")]
    JoinRoom { user_id: Uuid },
}
