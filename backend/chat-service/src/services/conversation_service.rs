use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::{Conversation, MessageSummary, UserProfile, UserRole};

/// One inbox row: a conversation annotated for a specific caller.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationListing {
    pub conversation_id: Uuid,
    pub other: UserProfile,
    pub unread_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageSummary>,
    pub updated_at: DateTime<Utc>,
}

pub struct ConversationService;

impl ConversationService {
    /// Find-or-create the single conversation for an unordered user pair.
    /// Safe under concurrent calls for the same pair: the unique index on
    /// (user_low, user_high) makes the loser of the insert race re-fetch.
    pub async fn resolve(db: &Pool<Postgres>, a: Uuid, b: Uuid) -> AppResult<Conversation> {
        let (low, high) = Conversation::ordered_pair(a, b);
        if let Some(existing) = Self::find_by_pair(db, low, high).await? {
            return Ok(existing);
        }

        let insert = sqlx::query(
            "INSERT INTO conversations (id, user_low, user_high) VALUES ($1, $2, $3) \
             RETURNING id, user_low, user_high, last_message_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(low)
        .bind(high)
        .fetch_one(db)
        .await;

        match insert {
            Ok(row) => Ok(row_to_conversation(&row)),
            Err(err) if is_unique_violation(&err) => Self::find_by_pair(db, low, high)
                .await?
                .ok_or(AppError::Internal),
            Err(err) => Err(err.into()),
        }
    }

    /// Lookup without creation; `None` when the pair has never talked.
    pub async fn find_between(
        db: &Pool<Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let (low, high) = Conversation::ordered_pair(a, b);
        Self::find_by_pair(db, low, high).await
    }

    async fn find_by_pair(
        db: &Pool<Postgres>,
        low: Uuid,
        high: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, user_low, user_high, last_message_id, created_at, updated_at \
             FROM conversations WHERE user_low = $1 AND user_high = $2",
        )
        .bind(low)
        .bind(high)
        .fetch_optional(db)
        .await?;
        Ok(row.as_ref().map(row_to_conversation))
    }

    pub async fn get(db: &Pool<Postgres>, id: Uuid) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, user_low, user_high, last_message_id, created_at, updated_at \
             FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row.as_ref().map(row_to_conversation))
    }

    /// All conversations containing `user_id`, newest activity first, each
    /// carrying the counterpart profile, the caller's unread count and the
    /// last-message summary. Read-only.
    pub async fn list_for_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> AppResult<Vec<ConversationListing>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id,
                   c.updated_at,
                   u.id    AS other_id,
                   u.name  AS other_name,
                   u.phone AS other_phone,
                   u.role  AS other_role,
                   COALESCE(cu.unread_count, 0)::bigint AS unread_count,
                   m.id         AS last_id,
                   m.sender_id  AS last_sender_id,
                   m.content    AS last_content,
                   (m.quotation IS NOT NULL) AS last_has_quotation,
                   m.created_at AS last_created_at
            FROM conversations c
            JOIN users u
              ON u.id = CASE WHEN c.user_low = $1 THEN c.user_high ELSE c.user_low END
            LEFT JOIN conversation_unreads cu
              ON cu.conversation_id = c.id AND cu.user_id = $1
            LEFT JOIN messages m ON m.id = c.last_message_id
            WHERE c.user_low = $1 OR c.user_high = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let role: String = row.get("other_role");
                let role = UserRole::parse(&role).ok_or(AppError::Internal)?;
                let last_message = row
                    .get::<Option<Uuid>, _>("last_id")
                    .map(|id| MessageSummary {
                        id,
                        sender_id: row.get("last_sender_id"),
                        content: row.get("last_content"),
                        has_quotation: row.get("last_has_quotation"),
                        created_at: row.get("last_created_at"),
                    });
                Ok(ConversationListing {
                    conversation_id: row.get("id"),
                    other: UserProfile {
                        id: row.get("other_id"),
                        name: row.get("other_name"),
                        phone: row.get("other_phone"),
                        role,
                    },
                    unread_count: row.get("unread_count"),
                    last_message,
                    updated_at: row.get("updated_at"),
                })
            })
            .collect()
    }

    /// Atomic per-key increment of the recipient's unread counter; returns
    /// the new count. Single statement, so concurrent sends cannot lose an
    /// update.
    pub async fn increment_unread<'e, E>(
        executor: E,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<i64>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let count: i32 = sqlx::query_scalar(
            "INSERT INTO conversation_unreads (conversation_id, user_id, unread_count) \
             VALUES ($1, $2, 1) \
             ON CONFLICT (conversation_id, user_id) \
             DO UPDATE SET unread_count = conversation_unreads.unread_count + 1 \
             RETURNING unread_count",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(count as i64)
    }

    /// Reset the caller's unread counter. Absent ledger row already means
    /// zero, so a plain UPDATE suffices.
    pub async fn reset_unread<'e, E>(
        executor: E,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE conversation_unreads SET unread_count = 0 \
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn unread_count(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<i64> {
        let count: Option<i32> = sqlx::query_scalar(
            "SELECT unread_count FROM conversation_unreads \
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(count.unwrap_or(0) as i64)
    }

    /// Point the conversation at its newest message and bump activity time.
    pub async fn set_last_message<'e, E>(
        executor: E,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE conversations SET last_message_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .bind(message_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}

fn row_to_conversation(row: &PgRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        user_low: row.get("user_low"),
        user_high: row.get("user_high"),
        last_message_id: row.get("last_message_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
