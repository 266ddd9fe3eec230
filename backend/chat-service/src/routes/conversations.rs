use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::services::conversation_service::{ConversationListing, ConversationService};
use crate::services::message_service::MessageService;
use crate::state::AppState;

/// GET /api/v1/conversations
///
/// The caller's inbox: every conversation they participate in, annotated
/// with the counterpart profile, last message and the caller's unread
/// count, most recently active first. Read-only.
pub async fn list_conversations(
    State(state): State<AppState>,
    user: User,
) -> Result<Json<Vec<ConversationListing>>, AppError> {
    let listings = ConversationService::list_for_user(&state.db, user.id).await?;
    Ok(Json(listings))
}

/// PATCH /api/v1/mark-read/:conversation_id
///
/// Explicit read acknowledgement; pushes a receipt to the counterpart.
pub async fn mark_read(
    State(state): State<AppState>,
    user: User,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    MessageService::mark_as_read(&state.db, &state.events, user.id, conversation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
