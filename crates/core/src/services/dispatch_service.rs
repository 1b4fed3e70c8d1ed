use serde_json::{Map, Value};
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::chain::{Chain, ChainFamily};
use crate::models::envelope::ResponseEnvelope;
use crate::models::intent::{Intent, IntentKind};
use crate::services::data_service::{
    DataService, DEFAULT_TRANSACTION_LIMIT, DEFAULT_TRANSACTION_OFFSET,
};

/// A fully-parameterised data-fetch call, or the explicit "nothing to fetch".
#[derive(Debug, Clone, PartialEq)]
pub enum DataOperation {
    WalletBalance {
        chain: Chain,
        address: String,
    },
    TokenBalances {
        chain: Chain,
        address: String,
    },
    TransactionHistory {
        chain: Chain,
        address: String,
        limit: u64,
        offset: u64,
    },
    TokenAllowance {
        chain: Chain,
        contract: String,
        owner: String,
        spender: String,
    },
    TokenBalanceChanges {
        chain: Chain,
        account_address: String,
        params: Map<String, Value>,
    },
    CustomQuery {
        chain: Chain,
        category: String,
        method: String,
        params: Vec<Value>,
    },
    NoDataRequired,
}

impl DataOperation {
    pub fn name(&self) -> &'static str {
        match self {
            DataOperation::WalletBalance { .. } => "wallet_balance",
            DataOperation::TokenBalances { .. } => "token_balances",
            DataOperation::TransactionHistory { .. } => "transaction_history",
            DataOperation::TokenAllowance { .. } => "token_allowance",
            DataOperation::TokenBalanceChanges { .. } => "token_balance_changes",
            DataOperation::CustomQuery { .. } => "custom_query",
            DataOperation::NoDataRequired => "no_data_required",
        }
    }
}

/// Result of dispatching an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Fetched(ResponseEnvelope),
    NoDataRequired,
}

impl DispatchOutcome {
    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            DispatchOutcome::Fetched(envelope) => Some(envelope),
            DispatchOutcome::NoDataRequired => None,
        }
    }

    pub fn into_envelope(self) -> Option<ResponseEnvelope> {
        match self {
            DispatchOutcome::Fetched(envelope) => Some(envelope),
            DispatchOutcome::NoDataRequired => None,
        }
    }
}

/// Pure switch from an intent to the operation that serves it.
///
/// Required identity fields are never invented here: every missing one is
/// reported together in a single [`CoreError::MissingParameter`].
pub fn plan(intent: &Intent) -> Result<DataOperation, CoreError> {
    if intent.kind == IntentKind::GeneralQuestion {
        return Ok(DataOperation::NoDataRequired);
    }

    let mut missing = Vec::new();
    let chain = intent.chain;
    if chain.is_none() {
        missing.push("chain");
    }

    // Checked before missing fields: the normalizer drops ledger addresses
    // given alongside an EVM chain.
    if intent.kind == IntentKind::TokenBalanceChanges {
        if let Some(chain) = chain.filter(|c| c.family() != ChainFamily::Ledger) {
            return Err(CoreError::UnsupportedChain {
                chain: chain.to_string(),
                supported: Chain::of_family(ChainFamily::Ledger)
                    .iter()
                    .map(Chain::to_string)
                    .collect(),
            });
        }
    }

    let mut require = |field: &'static str, value: Option<&str>| -> String {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => v.to_string(),
            None => {
                missing.push(field);
                String::new()
            }
        }
    };

    let op = match intent.kind {
        IntentKind::WalletBalance | IntentKind::TokenBalance | IntentKind::TransactionHistory => {
            let address = require("address", intent.address.as_deref());
            match (intent.kind, chain) {
                (_, None) => None,
                (IntentKind::WalletBalance, Some(chain)) => {
                    Some(DataOperation::WalletBalance { chain, address })
                }
                (IntentKind::TokenBalance, Some(chain)) => {
                    Some(DataOperation::TokenBalances { chain, address })
                }
                (_, Some(chain)) => Some(DataOperation::TransactionHistory {
                    chain,
                    address,
                    limit: intent.extra_u64("limit").unwrap_or(DEFAULT_TRANSACTION_LIMIT),
                    offset: intent.extra_u64("offset").unwrap_or(DEFAULT_TRANSACTION_OFFSET),
                }),
            }
        }
        IntentKind::TokenAllowance => {
            let contract = require("contractAddress", intent.contract_address.as_deref());
            let owner = require("ownerAddress", intent.owner_address.as_deref());
            let spender = require("spenderAddress", intent.spender_address.as_deref());
            chain.map(|chain| DataOperation::TokenAllowance {
                chain,
                contract,
                owner,
                spender,
            })
        }
        IntentKind::TokenBalanceChanges => {
            let account_address = require("address", intent.address.as_deref());
            chain.map(|chain| DataOperation::TokenBalanceChanges {
                chain,
                account_address,
                params: intent.extra_params.clone(),
            })
        }
        IntentKind::CustomQuery => {
            let category = require("category", intent.extra_str("category"));
            let method = require("method", intent.extra_str("method"));
            let params = match intent.extra_params.get("params") {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            chain.map(|chain| DataOperation::CustomQuery {
                chain,
                category,
                method,
                params,
            })
        }
        IntentKind::GeneralQuestion => Some(DataOperation::NoDataRequired),
    };

    if !missing.is_empty() {
        return Err(CoreError::missing(&missing));
    }
    op.ok_or_else(|| CoreError::missing(&["chain"]))
}

/// Routes canonical intents to exactly one data-fetch operation.
pub struct DispatchService {
    data: Arc<DataService>,
}

impl DispatchService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn dispatch(&self, intent: &Intent) -> Result<DispatchOutcome, CoreError> {
        let op = plan(intent)?;
        tracing::debug!(kind = %intent.kind, operation = op.name(), "dispatching intent");
        self.execute(op).await
    }

    pub async fn execute(&self, op: DataOperation) -> Result<DispatchOutcome, CoreError> {
        let envelope = match op {
            DataOperation::NoDataRequired => return Ok(DispatchOutcome::NoDataRequired),
            DataOperation::WalletBalance { chain, address } => {
                self.data.get_wallet_balance(chain, &address).await?
            }
            DataOperation::TokenBalances { chain, address } => {
                self.data.get_token_balances(chain, &address).await?
            }
            DataOperation::TransactionHistory {
                chain,
                address,
                limit,
                offset,
            } => {
                self.data
                    .get_transaction_history(chain, &address, Some(limit), Some(offset))
                    .await?
            }
            DataOperation::TokenAllowance {
                chain,
                contract,
                owner,
                spender,
            } => {
                self.data
                    .get_token_allowance(chain, &contract, &owner, &spender)
                    .await?
            }
            DataOperation::TokenBalanceChanges {
                chain,
                account_address,
                params,
            } => {
                self.data
                    .get_token_balance_changes(chain, &account_address, &params)
                    .await?
            }
            DataOperation::CustomQuery {
                chain,
                category,
                method,
                params,
            } => {
                self.data
                    .execute_custom_query(chain, &category, &method, params)
                    .await?
            }
        };
        Ok(DispatchOutcome::Fetched(envelope))
    }
}
