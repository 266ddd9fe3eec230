//! Wire types mirroring the chat-service REST and socket payloads. Kept as
//! an independent mirror so the client does not drag the server's database
//! stack into its dependency tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Farmer,
    Buyer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    pub crop_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    #[serde(default)]
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: QuotationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotation: Option<Quotation>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub has_quotation: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: UserRole,
}

/// One inbox row as served by GET /conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationListing {
    pub conversation_id: Uuid,
    pub other: UserProfile,
    pub unread_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageSummary>,
    pub updated_at: DateTime<Utc>,
}

/// Response of POST /send and POST /quotation: the message with the sender's
/// display fields flattened alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
    pub sender_role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotation: Option<Quotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotationDraft {
    pub recipient_id: Uuid,
    pub crop_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Server error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub code: String,
}

/// The three pushes the gateway can deliver, all addressed at this user.
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
        unread_count: i64,
    },
    #[serde(rename = "messages_read")]
    MessagesRead { conversation_id: Uuid, read_by: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_event_decodes_server_frame() {
        let conversation_id = Uuid::new_v4();
        let read_by = Uuid::new_v4();
        let frame = format!(
            r#"{{"type":"messages_read","conversation_id":"{conversation_id}","read_by":"{read_by}","timestamp":"2026-08-06T10:00:00Z"}}"#
        );
        let event: PushEvent = serde_json::from_str(&frame).unwrap();
        match event {
            PushEvent::MessagesRead {
                conversation_id: c,
                read_by: r,
            } => {
                assert_eq!(c, conversation_id);
                assert_eq!(r, read_by);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_sent_message_flatten_round_trip() {
        let body = serde_json::json!({
            "id": Uuid::new_v4(),
            "conversation_id": Uuid::new_v4(),
            "sender_id": Uuid::new_v4(),
            "recipient_id": Uuid::new_v4(),
            "content": "Interested in your tomatoes?",
            "is_read": false,
            "created_at": "2026-08-06T10:00:00Z",
            "sender_name": "Asha",
            "sender_role": "farmer"
        });
        let sent: SentMessage = serde_json::from_value(body).unwrap();
        assert_eq!(sent.sender_name, "Asha");
        assert_eq!(sent.sender_role, UserRole::Farmer);
        assert!(sent.message.quotation.is_none());
    }
}
