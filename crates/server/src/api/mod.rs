pub mod chat;
pub mod data;
pub mod health;
#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chain_chat_core::{models::chain::Chain, ChainChat};
use serde::Serialize;

use crate::error::Result;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChainChat>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Every API route, bound to `state`. Middleware is layered on by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/chains", get(health::list_chains))
        .route("/api/chat", post(chat::send_message))
        .route(
            "/api/mcp/balance/{chain}/{address}",
            get(data::get_balance),
        )
        .route("/api/mcp/tokens/{chain}/{address}", get(data::get_tokens))
        .route(
            "/api/mcp/transactions/{chain}/{address}",
            get(data::get_transactions),
        )
        .route("/api/mcp/allowance", post(data::get_allowance))
        .route("/api/mcp/balance-changes", post(data::get_balance_changes))
        .route("/api/mcp/query", post(data::execute_query))
        .with_state(state)
}

/// Parses a chain name from a path or body, ignoring case and surrounding
/// whitespace.
pub fn parse_chain(raw: &str) -> Result<Chain> {
    Ok(raw.trim().to_lowercase().parse::<Chain>()?)
}
