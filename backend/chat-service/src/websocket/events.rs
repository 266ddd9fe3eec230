//! Wire-level push events and the gateway task that emits them.
//!
//! The gateway subscribes to the domain event bus and translates each event
//! into a socket push addressed at a single user's room, plus a Redis
//! publish so other instances can deliver to connections they hold. Push
//! failures are logged and swallowed: the durable write already committed.

use axum::extract::ws;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::events::{DomainEvent, EventBus};
use crate::models::{Message, MessageSummary, UserRole};
use crate::websocket::{pubsub, RoomRegistry};

/// The three outbound event kinds. Always directed at one recipient's room,
/// never broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    #[serde(rename = "receive_message")]
    ReceiveMessage {
        message: Message,
        sender_name: String,
        sender_role: UserRole,
    },
    #[serde(rename = "conversation_updated")]
    ConversationUpdated {
        conversation_id: Uuid,
        last_message: MessageSummary,
        /// Scoped to the receiving user.
        unread_count: i64,
    },
    #[serde(rename = "messages_read")]
    MessagesRead { conversation_id: Uuid, read_by: Uuid },
}

impl PushEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ReceiveMessage { .. } => "receive_message",
            Self::ConversationUpdated { .. } => "conversation_updated",
            Self::MessagesRead { .. } => "messages_read",
        }
    }

    /// Translate a domain event into (recipient, wire event).
    pub fn from_domain(event: DomainEvent) -> (Uuid, PushEvent) {
        match event {
            DomainEvent::MessageSent {
                recipient_id,
                message,
                sender,
            } => (
                recipient_id,
                PushEvent::ReceiveMessage {
                    message,
                    sender_name: sender.name,
                    sender_role: sender.role,
                },
            ),
            DomainEvent::ConversationUpdated {
                recipient_id,
                conversation_id,
                last_message,
                unread_count,
            } => (
                recipient_id,
                PushEvent::ConversationUpdated {
                    conversation_id,
                    last_message,
                    unread_count,
                },
            ),
            DomainEvent::MessagesRead {
                recipient_id,
                conversation_id,
                read_by,
            } => (
                recipient_id,
                PushEvent::MessagesRead {
                    conversation_id,
                    read_by,
                },
            ),
        }
    }

    /// Flat JSON: `type` + event fields + `timestamp`. This is the only
    /// place outbound frames are serialized.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        value["timestamp"] = serde_json::json!(Utc::now().to_rfc3339());
        serde_json::to_string(&value)
    }
}

/// Deliver one domain event: local room push plus cross-instance publish.
pub async fn deliver(registry: &RoomRegistry, redis: &redis::Client, event: DomainEvent) {
    let (recipient, push) = PushEvent::from_domain(event);
    let payload = match push.to_payload() {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, event = push.event_type(), "push event serialization failed");
            return;
        }
    };

    registry
        .push(recipient, ws::Message::Text(payload.clone()))
        .await;

    if let Err(err) = pubsub::publish(redis, recipient, &payload).await {
        tracing::warn!(error = %err, %recipient, "redis push publish failed");
    }
}

/// Gateway loop: drain the domain event bus until every publisher is gone.
pub async fn run_gateway(bus: EventBus, registry: RoomRegistry, redis: redis::Client) {
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => deliver(&registry, &redis, event).await,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "gateway lagged; push events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    fn sample_message(recipient_id: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            recipient_id,
            content: "Interested in your tomatoes?".into(),
            quotation: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_receive_message_payload_shape() {
        let recipient = Uuid::new_v4();
        let message = sample_message(recipient);
        let event = PushEvent::ReceiveMessage {
            message: message.clone(),
            sender_name: "Asha".into(),
            sender_role: UserRole::Farmer,
        };

        let payload: serde_json::Value =
            serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(payload["type"], "receive_message");
        assert_eq!(payload["sender_name"], "Asha");
        assert_eq!(payload["sender_role"], "farmer");
        assert_eq!(payload["message"]["id"], message.id.to_string());
        assert_eq!(payload["message"]["is_read"], false);
        assert!(payload["timestamp"].is_string());
    }

    #[test]
    fn test_conversation_updated_payload_shape() {
        let conversation_id = Uuid::new_v4();
        let message = sample_message(Uuid::new_v4());
        let event = PushEvent::ConversationUpdated {
            conversation_id,
            last_message: MessageSummary::of(&message),
            unread_count: 3,
        };

        let payload: serde_json::Value =
            serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(payload["type"], "conversation_updated");
        assert_eq!(payload["conversation_id"], conversation_id.to_string());
        assert_eq!(payload["unread_count"], 3);
        assert_eq!(payload["last_message"]["id"], message.id.to_string());
    }

    #[test]
    fn test_messages_read_payload_shape() {
        let conversation_id = Uuid::new_v4();
        let read_by = Uuid::new_v4();
        let event = PushEvent::MessagesRead {
            conversation_id,
            read_by,
        };

        let payload: serde_json::Value =
            serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(payload["type"], "messages_read");
        assert_eq!(payload["read_by"], read_by.to_string());
    }

    #[test]
    fn test_from_domain_addresses_the_recipient() {
        let recipient = Uuid::new_v4();
        let message = sample_message(recipient);
        let (addressed, push) = PushEvent::from_domain(DomainEvent::MessageSent {
            recipient_id: recipient,
            message,
            sender: UserProfile {
                id: Uuid::new_v4(),
                name: "Asha".into(),
                phone: "".into(),
                role: UserRole::Farmer,
            },
        });
        assert_eq!(addressed, recipient);
        assert_eq!(push.event_type(), "receive_message");
    }
}
