use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::chain::{Chain, ChainFamily};
use crate::models::envelope::{
    Pagination, Payload, RequestEnvelope, ResponseEnvelope, TokenBalance, Transaction,
};
use crate::models::settings::Settings;
use crate::providers::traits::BlockchainDataProvider;
use crate::validation::require_valid_address;

pub const DEFAULT_TRANSACTION_LIMIT: u64 = 50;
pub const DEFAULT_TRANSACTION_OFFSET: u64 = 0;

/// The data-fetch operations. Each one re-validates its inputs, makes
/// exactly one provider call, and shapes the reply into a
/// [`ResponseEnvelope`].
///
/// Provider failures come back as [`CoreError::DataFetchFailed`] carrying
/// the chain and subject address; the upstream detail is logged and kept
/// in `cause` but never rendered to the caller.
pub struct DataService {
    provider: Arc<dyn BlockchainDataProvider>,
    settings: Arc<Settings>,
}

impl DataService {
    pub fn new(provider: Arc<dyn BlockchainDataProvider>, settings: Arc<Settings>) -> Self {
        Self { provider, settings }
    }

    /// Native coin balance of `address`.
    pub async fn get_wallet_balance(
        &self,
        chain: Chain,
        address: &str,
    ) -> Result<ResponseEnvelope, CoreError> {
        require_valid_address("address", address, chain)?;

        let request = self.web3(
            chain,
            "native",
            "getNativeBalanceByAccount",
            object(&[("accountAddress", json!(address))]),
        );
        let body = self.call(&request, address).await?;

        Ok(ResponseEnvelope::new(
            chain,
            Some(address.to_string()),
            Payload::Balance(amount_string(extract_result(&body), "balance")),
            None,
        ))
    }

    /// Every token balance held by `address`.
    pub async fn get_token_balances(
        &self,
        chain: Chain,
        address: &str,
    ) -> Result<ResponseEnvelope, CoreError> {
        require_valid_address("address", address, chain)?;

        let request = self.web3(
            chain,
            "token",
            "getTokenBalancesByAccount",
            object(&[("accountAddress", json!(address))]),
        );
        let body = self.call(&request, address).await?;

        let tokens = list_items(extract_result(&body))
            .iter()
            .map(TokenBalance::from_value)
            .collect();

        Ok(ResponseEnvelope::new(
            chain,
            Some(address.to_string()),
            Payload::Tokens(tokens),
            None,
        ))
    }

    /// Transactions of `address`, `limit`/`offset` defaulting to 50/0.
    pub async fn get_transaction_history(
        &self,
        chain: Chain,
        address: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<ResponseEnvelope, CoreError> {
        require_valid_address("address", address, chain)?;
        let limit = limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
        let offset = offset.unwrap_or(DEFAULT_TRANSACTION_OFFSET);

        let request = self.web3(
            chain,
            "blockchain",
            "getTransactionsByAccount",
            object(&[
                ("accountAddress", json!(address)),
                ("limit", json!(limit)),
                ("offset", json!(offset)),
            ]),
        );
        let body = self.call(&request, address).await?;

        let transactions = list_items(extract_result(&body))
            .iter()
            .map(Transaction::from_value)
            .collect();
        let pagination = Pagination {
            limit: Some(limit),
            offset: Some(offset),
            total: Some(body.get("total").and_then(Value::as_u64).unwrap_or(0)),
            ..Pagination::default()
        };

        Ok(ResponseEnvelope::new(
            chain,
            Some(address.to_string()),
            Payload::Transactions(transactions),
            Some(pagination),
        ))
    }

    /// How much `spender` may move of `owner`'s balance of `contract`.
    /// The envelope's subject is the owner.
    pub async fn get_token_allowance(
        &self,
        chain: Chain,
        contract: &str,
        owner: &str,
        spender: &str,
    ) -> Result<ResponseEnvelope, CoreError> {
        require_valid_address("contractAddress", contract, chain)?;
        require_valid_address("ownerAddress", owner, chain)?;
        require_valid_address("spenderAddress", spender, chain)?;

        let request = self.web3(
            chain,
            "token",
            "getTokenAllowance",
            object(&[
                ("contractAddress", json!(contract)),
                ("ownerAddress", json!(owner)),
                ("spenderAddress", json!(spender)),
            ]),
        );
        let body = self.call(&request, owner).await?;

        let raw = body
            .get("allowance")
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| extract_result(&body));

        Ok(ResponseEnvelope::new(
            chain,
            Some(owner.to_string()),
            Payload::Allowance(amount_string(raw, "allowance")),
            None,
        ))
    }

    /// Token balance deltas of a ledger-family account. `params` are passed
    /// through to the provider alongside `accountAddress`.
    pub async fn get_token_balance_changes(
        &self,
        chain: Chain,
        account_address: &str,
        params: &Map<String, Value>,
    ) -> Result<ResponseEnvelope, CoreError> {
        if chain.family() != ChainFamily::Ledger {
            return Err(CoreError::UnsupportedChain {
                chain: chain.to_string(),
                supported: Chain::of_family(ChainFamily::Ledger)
                    .iter()
                    .map(Chain::to_string)
                    .collect(),
            });
        }
        require_valid_address("accountAddress", account_address, chain)?;

        let mut body_params = params.clone();
        body_params.insert("accountAddress".into(), json!(account_address));
        let request = self.web3(chain, "token", "getTokenBalanceChangesByAccount", body_params);
        let body = self.call(&request, account_address).await?;

        let changes = match body.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => list_items(extract_result(&body)),
        };

        Ok(ResponseEnvelope::new(
            chain,
            Some(account_address.to_string()),
            Payload::BalanceChanges(changes),
            Pagination::from_page_fields(&body),
        ))
    }

    /// Raw node-level JSON-RPC call `{category}_{method}(params)`.
    pub async fn execute_custom_query(
        &self,
        chain: Chain,
        category: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<ResponseEnvelope, CoreError> {
        if category.trim().is_empty() {
            return Err(CoreError::validation("category", "must not be empty"));
        }
        if method.trim().is_empty() {
            return Err(CoreError::validation("method", "must not be empty"));
        }

        let request = RequestEnvelope::node(chain, category, method, params)
            .with_credential(self.settings.data_api_key.clone());
        let subject = request.rpc_method();
        let body = self.call(&request, &subject).await?;

        Ok(ResponseEnvelope::new(
            chain,
            None,
            Payload::Custom(extract_result(&body).clone()),
            None,
        ))
    }

    fn web3(
        &self,
        chain: Chain,
        category: &str,
        method: &str,
        params: Map<String, Value>,
    ) -> RequestEnvelope {
        RequestEnvelope::web3(chain, category, method, params)
            .with_credential(self.settings.data_api_key.clone())
    }

    /// One provider call; failures other than an unsupported chain are
    /// wrapped with subject context.
    async fn call(&self, request: &RequestEnvelope, subject: &str) -> Result<Value, CoreError> {
        self.provider.send(request).await.map_err(|e| match e {
            CoreError::UnsupportedChain { .. } => e,
            other => {
                tracing::warn!(
                    provider = self.provider.name(),
                    chain = %request.chain,
                    method = %request.method,
                    subject,
                    cause = %other,
                    "data fetch failed"
                );
                CoreError::DataFetchFailed {
                    chain: request.chain.to_string(),
                    subject_address: subject.to_string(),
                    upstream_status: other.upstream_status(),
                    cause: other.to_string(),
                }
            }
        })
    }
}

// ── Response shaping ────────────────────────────────────────────────

fn object(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// The `result` field when present, else the whole body.
fn extract_result(body: &Value) -> &Value {
    body.get("result").filter(|v| !v.is_null()).unwrap_or(body)
}

/// A list result: either the value itself or its `items` array.
fn list_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(obj) => match obj.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Numeric string from a string, a number, or an object holding `key`.
fn amount_string(value: &Value, key: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => match obj.get(key) {
            Some(inner) if !inner.is_object() => amount_string(inner, key),
            _ => "0".to_string(),
        },
        _ => "0".to_string(),
    }
}
