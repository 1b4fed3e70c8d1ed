use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chain_chat_core::{
    errors::CoreError,
    models::{envelope::ResponseEnvelope, intent::IntentKind},
};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{parse_chain, ApiResponse, AppState};
use crate::error::Result;

type EnvelopeResponse = Json<ApiResponse<ResponseEnvelope>>;

/// GET /api/mcp/balance/{chain}/{address}
pub async fn get_balance(
    State(state): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<EnvelopeResponse> {
    let chain = parse_chain(&chain)?;
    let envelope = state.chat.data().get_wallet_balance(chain, &address).await?;
    Ok(Json(ApiResponse::success(envelope)))
}

/// GET /api/mcp/tokens/{chain}/{address}
pub async fn get_tokens(
    State(state): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<EnvelopeResponse> {
    let chain = parse_chain(&chain)?;
    let envelope = state.chat.data().get_token_balances(chain, &address).await?;
    Ok(Json(ApiResponse::success(envelope)))
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// GET /api/mcp/transactions/{chain}/{address}?limit=&offset=
pub async fn get_transactions(
    State(state): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
    Query(query): Query<TransactionsQuery>,
) -> Result<EnvelopeResponse> {
    let chain = parse_chain(&chain)?;
    let envelope = state
        .chat
        .data()
        .get_transaction_history(chain, &address, query.limit, query.offset)
        .await?;
    Ok(Json(ApiResponse::success(envelope)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceRequest {
    pub chain: Option<String>,
    pub contract_address: Option<String>,
    pub owner_address: Option<String>,
    pub spender_address: Option<String>,
}

/// POST /api/mcp/allowance
pub async fn get_allowance(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AllowanceRequest>, JsonRejection>,
) -> Result<EnvelopeResponse> {
    let Json(req) = payload?;
    let (Some(chain), Some(contract), Some(owner), Some(spender)) = (
        present(req.chain.as_deref()),
        present(req.contract_address.as_deref()),
        present(req.owner_address.as_deref()),
        present(req.spender_address.as_deref()),
    ) else {
        let mut missing = Vec::new();
        for (field, value) in [
            ("chain", &req.chain),
            ("contractAddress", &req.contract_address),
            ("ownerAddress", &req.owner_address),
            ("spenderAddress", &req.spender_address),
        ] {
            if present(value.as_deref()).is_none() {
                missing.push(field);
            }
        }
        return Err(CoreError::missing(&missing).into());
    };

    let chain = parse_chain(chain)?;
    let envelope = state
        .chat
        .data()
        .get_token_allowance(chain, contract, owner, spender)
        .await?;
    Ok(Json(ApiResponse::success(envelope)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChangesRequest {
    pub chain: Option<String>,
    pub account_address: Option<String>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// POST /api/mcp/balance-changes
///
/// Any body fields besides `chain` and `accountAddress` are forwarded to the
/// provider unchanged.
pub async fn get_balance_changes(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BalanceChangesRequest>, JsonRejection>,
) -> Result<EnvelopeResponse> {
    let Json(req) = payload?;
    let Some(account) = present(req.account_address.as_deref()) else {
        return Err(CoreError::missing(&["accountAddress"]).into());
    };
    let chain = match present(req.chain.as_deref()) {
        Some(chain) => parse_chain(chain)?,
        None => {
            let fallback = state.chat.settings().default_chain;
            IntentKind::TokenBalanceChanges.default_chain(fallback)
        }
    };

    let envelope = state
        .chat
        .data()
        .get_token_balance_changes(chain, account, &req.params)
        .await?;
    Ok(Json(ApiResponse::success(envelope)))
}

#[derive(Debug, Deserialize)]
pub struct CustomQueryRequest {
    pub chain: Option<String>,
    pub category: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// POST /api/mcp/query
pub async fn execute_query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CustomQueryRequest>, JsonRejection>,
) -> Result<EnvelopeResponse> {
    let Json(req) = payload?;
    let (Some(category), Some(method)) = (
        present(req.category.as_deref()),
        present(req.method.as_deref()),
    ) else {
        let mut missing = Vec::new();
        if present(req.category.as_deref()).is_none() {
            missing.push("category");
        }
        if present(req.method.as_deref()).is_none() {
            missing.push("method");
        }
        return Err(CoreError::missing(&missing).into());
    };
    let chain = match present(req.chain.as_deref()) {
        Some(chain) => parse_chain(chain)?,
        None => state.chat.settings().default_chain,
    };

    let envelope = state
        .chat
        .data()
        .execute_custom_query(chain, category, method, req.params)
        .await?;
    Ok(Json(ApiResponse::success(envelope)))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
