use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use super::conversation_service::ConversationService;
use super::user_service::UserService;
use crate::error::{AppError, AppResult};
use crate::events::{DomainEvent, EventBus};
use crate::models::{Message, MessageSummary, Quotation, UserProfile};

/// A persisted message enriched with the sender's display profile, as
/// returned to the caller and pushed to the recipient.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub sender: UserProfile,
}

pub struct MessageService;

impl MessageService {
    /// Send a message (optionally carrying a quotation) from `sender_id` to
    /// `recipient_id`. Validates before any write, applies the message
    /// insert, unread increment and last-message bump as one transaction,
    /// then publishes the push events. The push is fire-and-forget; the
    /// durable write has already committed.
    pub async fn send(
        db: &Pool<Postgres>,
        bus: &EventBus,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: Option<String>,
        quotation: Option<Quotation>,
    ) -> AppResult<SentMessage> {
        if sender_id == recipient_id {
            return Err(AppError::BadRequest(
                "cannot send a message to yourself".into(),
            ));
        }
        if let Some(ref q) = quotation {
            validate_quotation(q)?;
        }
        let content = resolve_content(content.as_deref(), quotation.as_ref())?;

        let sender = UserService::get_profile(db, sender_id).await?;
        UserService::find_profile(db, recipient_id)
            .await?
            .ok_or(AppError::NotFound("recipient"))?;

        let conversation = ConversationService::resolve(db, sender_id, recipient_id).await?;

        let id = Uuid::new_v4();
        let quotation_json = quotation
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|_| AppError::Internal)?;

        let mut tx = db.begin().await?;
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO messages (id, conversation_id, sender_id, recipient_id, content, quotation) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING created_at",
        )
        .bind(id)
        .bind(conversation.id)
        .bind(sender_id)
        .bind(recipient_id)
        .bind(&content)
        .bind(quotation_json)
        .fetch_one(&mut *tx)
        .await?;
        let unread_count =
            ConversationService::increment_unread(&mut *tx, conversation.id, recipient_id).await?;
        ConversationService::set_last_message(&mut *tx, conversation.id, id).await?;
        tx.commit().await?;

        let message = Message {
            id,
            conversation_id: conversation.id,
            sender_id,
            recipient_id,
            content,
            quotation,
            is_read: false,
            created_at,
        };

        bus.publish(DomainEvent::MessageSent {
            recipient_id,
            message: message.clone(),
            sender: sender.clone(),
        });
        bus.publish(DomainEvent::ConversationUpdated {
            recipient_id,
            conversation_id: conversation.id,
            last_message: MessageSummary::of(&message),
            unread_count,
        });

        Ok(SentMessage { message, sender })
    }

    /// Full thread between `user_id` and `other_user_id`, oldest first.
    /// Viewing acknowledges: every unread message addressed to the caller is
    /// flipped read and the caller's unread counter resets, in one
    /// transaction. A pair that has never talked yields an empty list.
    pub async fn history_and_acknowledge(
        db: &Pool<Postgres>,
        bus: &EventBus,
        user_id: Uuid,
        other_user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        UserService::find_profile(db, other_user_id)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let Some(conversation) = ConversationService::find_between(db, user_id, other_user_id).await?
        else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_id, recipient_id, content, quotation, is_read, created_at \
             FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC LIMIT $2",
        )
        .bind(conversation.id)
        .bind(limit)
        .fetch_all(db)
        .await?;
        let messages = rows.iter().map(row_to_message).collect();

        let acknowledged = Self::acknowledge(db, conversation.id, user_id).await?;
        if acknowledged > 0 {
            bus.publish(DomainEvent::MessagesRead {
                recipient_id: other_user_id,
                conversation_id: conversation.id,
                read_by: user_id,
            });
        }

        Ok(messages)
    }

    /// Explicit read acknowledgement for a conversation. Idempotent; a call
    /// with nothing unread succeeds without a push.
    pub async fn mark_as_read(
        db: &Pool<Postgres>,
        bus: &EventBus,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<()> {
        let conversation = ConversationService::get(db, conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        if !conversation.is_participant(user_id) {
            return Err(AppError::Forbidden);
        }

        let acknowledged = Self::acknowledge(db, conversation_id, user_id).await?;
        if acknowledged > 0 {
            bus.publish(DomainEvent::MessagesRead {
                recipient_id: conversation.other_participant(user_id),
                conversation_id,
                read_by: user_id,
            });
        }
        Ok(())
    }

    /// Flip every unread message addressed to `user_id` and zero the ledger
    /// row, transactionally so the two stay consistent. Returns how many
    /// messages flipped.
    async fn acknowledge(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<u64> {
        let mut tx = db.begin().await?;
        let flipped = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE conversation_id = $1 AND recipient_id = $2 AND is_read = FALSE",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        ConversationService::reset_unread(&mut *tx, conversation_id, user_id).await?;
        tx.commit().await?;
        Ok(flipped)
    }
}

fn resolve_content(content: Option<&str>, quotation: Option<&Quotation>) -> AppResult<String> {
    match (content, quotation) {
        (Some(c), _) if !c.trim().is_empty() => Ok(c.to_string()),
        (_, Some(q)) => Ok(q.default_content()),
        _ => Err(AppError::BadRequest("content or quotation is required".into())),
    }
}

fn validate_quotation(q: &Quotation) -> AppResult<()> {
    if q.crop_name.trim().is_empty() {
        return Err(AppError::BadRequest("quotation crop_name is required".into()));
    }
    if q.unit.trim().is_empty() {
        return Err(AppError::BadRequest("quotation unit is required".into()));
    }
    if q.quantity < 1.0 {
        return Err(AppError::BadRequest(
            "quotation quantity must be at least 1".into(),
        ));
    }
    if let Some(price) = q.price_per_unit {
        if price < 0.0 {
            return Err(AppError::BadRequest(
                "quotation price_per_unit cannot be negative".into(),
            ));
        }
    }
    if q.total < 0.0 {
        return Err(AppError::BadRequest("quotation total cannot be negative".into()));
    }
    Ok(())
}

fn row_to_message(row: &PgRow) -> Message {
    let quotation = row
        .get::<Option<serde_json::Value>, _>("quotation")
        .and_then(|value| serde_json::from_value(value).ok());
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        recipient_id: row.get("recipient_id"),
        content: row.get("content"),
        quotation,
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuotationStatus;

    fn quotation() -> Quotation {
        Quotation {
            crop_name: "Tomato".into(),
            quantity: 50.0,
            unit: "kg".into(),
            price_per_unit: Some(20.0),
            total: 0.0,
            notes: None,
            status: QuotationStatus::Pending,
        }
    }

    #[test]
    fn test_resolve_content_prefers_explicit_text() {
        let q = quotation();
        let content = resolve_content(Some("Is this still available?"), Some(&q)).unwrap();
        assert_eq!(content, "Is this still available?");
    }

    #[test]
    fn test_resolve_content_defaults_from_quotation() {
        let q = quotation();
        assert_eq!(
            resolve_content(None, Some(&q)).unwrap(),
            "Quotation request for Tomato"
        );
        assert_eq!(
            resolve_content(Some("  "), Some(&q)).unwrap(),
            "Quotation request for Tomato"
        );
    }

    #[test]
    fn test_resolve_content_rejects_empty_send() {
        assert!(matches!(
            resolve_content(None, None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_content(Some(""), None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_validate_quotation_accepts_minimal() {
        let mut q = quotation();
        q.price_per_unit = None;
        assert!(validate_quotation(&q).is_ok());
    }

    #[test]
    fn test_validate_quotation_rejects_bad_fields() {
        let mut q = quotation();
        q.crop_name = " ".into();
        assert!(validate_quotation(&q).is_err());

        let mut q = quotation();
        q.quantity = 0.5;
        assert!(validate_quotation(&q).is_err());

        let mut q = quotation();
        q.unit = "".into();
        assert!(validate_quotation(&q).is_err());

        let mut q = quotation();
        q.price_per_unit = Some(-1.0);
        assert!(validate_quotation(&q).is_err());
    }
}
