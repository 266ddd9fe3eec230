use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::{Message, Quotation, QuotationStatus, UserRole};
use crate::services::message_service::MessageService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub content: Option<String>,
    pub quotation: Option<Quotation>,
}

#[derive(Debug, Deserialize)]
pub struct SendQuotationRequest {
    pub recipient_id: Uuid,
    pub crop_name: String,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: Option<f64>,
    pub total: Option<f64>,
    pub notes: Option<String>,
}

/// The created message enriched with the sender's display profile, mirroring
/// what the recipient's `receive_message` push carries.
#[derive(Debug, Serialize)]
pub struct SentMessageResponse {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
    pub sender_role: UserRole,
}

/// POST /api/v1/send
pub async fn send_message(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SentMessageResponse>), AppError> {
    let sent = MessageService::send(
        &state.db,
        &state.events,
        user.id,
        body.recipient_id,
        body.content,
        body.quotation,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SentMessageResponse {
            message: sent.message,
            sender_name: sent.sender.name,
            sender_role: sent.sender.role,
        }),
    ))
}

/// POST /api/v1/quotation
///
/// Same write path as /send with the quotation attached; the body text
/// defaults to the quotation notes or a templated line.
pub async fn send_quotation(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<SendQuotationRequest>,
) -> Result<(StatusCode, Json<SentMessageResponse>), AppError> {
    let quotation = Quotation {
        crop_name: body.crop_name,
        quantity: body.quantity,
        unit: body.unit,
        price_per_unit: body.price_per_unit,
        total: body.total.unwrap_or(0.0),
        notes: body.notes,
        status: QuotationStatus::Pending,
    };

    let sent = MessageService::send(
        &state.db,
        &state.events,
        user.id,
        body.recipient_id,
        None,
        Some(quotation),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SentMessageResponse {
            message: sent.message,
            sender_name: sent.sender.name,
            sender_role: sent.sender.role,
        }),
    ))
}

/// GET /api/v1/history/:recipient_id
///
/// Chronological thread with the named user. Viewing acknowledges: unread
/// messages addressed to the caller flip read and their counter resets.
pub async fn get_history(
    State(state): State<AppState>,
    user: User,
    Path(recipient_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = MessageService::history_and_acknowledge(
        &state.db,
        &state.events,
        user.id,
        recipient_id,
        state.config.history_limit,
    )
    .await?;
    Ok(Json(messages))
}
