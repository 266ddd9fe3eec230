//! Domain events emitted by the chat service write paths.
//!
//! The write path never talks to a socket directly: it publishes one of
//! these events and returns. The realtime gateway subscribes and translates
//! each event into a push to the addressed user's room. Tests subscribe a
//! plain receiver instead of a socket.

use crate::models::{Message, MessageSummary, UserProfile};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Every event is addressed at exactly one user (never broadcast).
#[derive(Debug, Clone)]
pub enum DomainEvent {
    MessageSent {
        recipient_id: Uuid,
        message: Message,
        sender: UserProfile,
    },
    ConversationUpdated {
        recipient_id: Uuid,
        conversation_id: Uuid,
        last_message: MessageSummary,
        unread_count: i64,
    },
    MessagesRead {
        recipient_id: Uuid,
        conversation_id: Uuid,
        read_by: Uuid,
    },
}

impl DomainEvent {
    pub fn recipient_id(&self) -> Uuid {
        match self {
            DomainEvent::MessageSent { recipient_id, .. }
            | DomainEvent::ConversationUpdated { recipient_id, .. }
            | DomainEvent::MessagesRead { recipient_id, .. } => *recipient_id,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Fire-and-forget: an event with no live subscriber is dropped, matching
    /// the best-effort push contract (durable state already committed).
    pub fn publish(&self, event: DomainEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::debug!(error = %err, "domain event dropped (no subscribers)");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_read_event(recipient: Uuid) -> DomainEvent {
        DomainEvent::MessagesRead {
            recipient_id: recipient,
            conversation_id: Uuid::new_v4(),
            read_by: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let recipient = Uuid::new_v4();

        bus.publish(sample_read_event(recipient));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.recipient_id(), recipient);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        // Must not panic or error.
        bus.publish(sample_read_event(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_all_variants_report_recipient() {
        let recipient = Uuid::new_v4();
        let message = crate::models::Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            recipient_id: recipient,
            content: "hello".into(),
            quotation: None,
            is_read: false,
            created_at: Utc::now(),
        };
        let summary = crate::models::MessageSummary::of(&message);

        let sent = DomainEvent::MessageSent {
            recipient_id: recipient,
            message,
            sender: crate::models::UserProfile {
                id: Uuid::new_v4(),
                name: "Asha".into(),
                phone: "".into(),
                role: crate::models::UserRole::Farmer,
            },
        };
        let updated = DomainEvent::ConversationUpdated {
            recipient_id: recipient,
            conversation_id: Uuid::new_v4(),
            last_message: summary,
            unread_count: 3,
        };

        assert_eq!(sent.recipient_id(), recipient);
        assert_eq!(updated.recipient_id(), recipient);
        assert_eq!(sample_read_event(recipient).recipient_id(), recipient);
    }
}
