use axum::{extract::State, Json};
use axum::extract::rejection::JsonRejection;
use chain_chat_core::models::chat::{ChatRequest, ChatResponse};

use super::{ApiResponse, AppState};
use crate::error::Result;

/// POST /api/chat
pub async fn send_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ChatResponse>>> {
    let Json(request) = payload?;
    tracing::info!(
        session_id = request.session_id.as_deref().unwrap_or("-"),
        chars = request.message.chars().count(),
        "chat message received"
    );

    let response = state.chat.process_chat_message(&request).await?;
    Ok(Json(ApiResponse::success(response)))
}
