use crate::middleware::auth::auth_middleware;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

pub mod conversations;
pub mod messages;

use conversations::{list_conversations, mark_read};
use messages::{get_history, send_message, send_quotation};

pub fn build_router(state: AppState) -> Router {
    // REST surface; every route requires a verified bearer identity.
    let secured = Router::new()
        .route("/conversations", get(list_conversations))
        .route("/history/:recipient_id", get(get_history))
        .route("/send", post(send_message))
        .route("/quotation", post(send_quotation))
        .route("/mark-read/:conversation_id", patch(mark_read))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // The websocket upgrade authenticates itself: browsers cannot set an
    // Authorization header on the handshake, so the token may arrive as a
    // query parameter instead.
    let api_v1 = secured.route("/ws", get(crate::websocket::handlers::ws_handler));

    let router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/v1", api_v1);

    crate::middleware::with_defaults(router).with_state(state)
}
