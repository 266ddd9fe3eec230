use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl Default for QuotationStatus {
    fn default() -> Self {
        QuotationStatus::Pending
    }
}

/// A structured price proposal embedded in a chat message. Stored as jsonb
/// on the message row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quotation {
    pub crop_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    /// Stored as submitted; never computed server-side.
    #[serde(default)]
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: QuotationStatus,
}

impl Quotation {
    /// Body text used when the sender supplied no message content.
    pub fn default_content(&self) -> String {
        match self.notes.as_deref() {
            Some(notes) if !notes.trim().is_empty() => notes.to_string(),
            _ => format!("Quotation request for {}", self.crop_name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotation: Option<Quotation>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Compact last-message view shipped in inbox rows and push events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub has_quotation: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageSummary {
    pub fn of(message: &Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            has_quotation: message.quotation.is_some(),
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_content_prefers_notes() {
        let q = Quotation {
            crop_name: "Tomato".into(),
            quantity: 50.0,
            unit: "kg".into(),
            price_per_unit: Some(20.0),
            total: 0.0,
            notes: Some("Fresh harvest, ready Friday".into()),
            status: QuotationStatus::default(),
        };
        assert_eq!(q.default_content(), "Fresh harvest, ready Friday");
    }

    #[test]
    fn test_default_content_falls_back_to_template() {
        let q = Quotation {
            crop_name: "Tomato".into(),
            quantity: 50.0,
            unit: "kg".into(),
            price_per_unit: None,
            total: 0.0,
            notes: Some("   ".into()),
            status: QuotationStatus::default(),
        };
        assert_eq!(q.default_content(), "Quotation request for Tomato");
    }

    #[test]
    fn test_quotation_deserialize_defaults() {
        let q: Quotation = serde_json::from_str(
            r#"{"crop_name":"Maize","quantity":10,"unit":"bag"}"#,
        )
        .unwrap();
        assert_eq!(q.status, QuotationStatus::Pending);
        assert_eq!(q.total, 0.0);
        assert!(q.price_per_unit.is_none());
    }

    #[test]
    fn test_quotation_jsonb_round_trip() {
        let q = Quotation {
            crop_name: "Tomato".into(),
            quantity: 50.0,
            unit: "kg".into(),
            price_per_unit: Some(20.0),
            total: 1000.0,
            notes: None,
            status: QuotationStatus::Pending,
        };
        let value = serde_json::to_value(&q).unwrap();
        let back: Quotation = serde_json::from_value(value).unwrap();
        assert_eq!(back, q);
    }
}
