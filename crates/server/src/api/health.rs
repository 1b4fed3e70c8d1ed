use axum::Json;
use chain_chat_core::{models::chain::ChainFamily, ChainChat};
use serde::Serialize;

use super::ApiResponse;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

#[derive(Serialize)]
pub struct ChainInfo {
    pub name: &'static str,
    pub family: ChainFamily,
}

/// GET /api/chains
pub async fn list_chains() -> Json<ApiResponse<Vec<ChainInfo>>> {
    let chains = ChainChat::supported_chains()
        .iter()
        .map(|chain| ChainInfo {
            name: chain.as_str(),
            family: chain.family(),
        })
        .collect();
    Json(ApiResponse::success(chains))
}
