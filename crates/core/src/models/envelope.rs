use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::chain::Chain;

/// Which of the provider's two APIs a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiSurface {
    /// Indexed data API: `POST {endpoint}{category}/{method}` with an object body.
    Web3,
    /// Raw node JSON-RPC: `{category}_{method}` with positional params.
    Node,
}

/// One outbound call to the data provider. Built fresh per call.
#[derive(Clone, PartialEq)]
pub struct RequestEnvelope {
    pub chain: Chain,
    pub surface: ApiSurface,
    pub category: String,
    pub method: String,
    /// Object body for `Web3`, positional array for `Node`.
    pub params: Value,
    pub api_key: Option<String>,
}

impl RequestEnvelope {
    pub fn web3(
        chain: Chain,
        category: impl Into<String>,
        method: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            chain,
            surface: ApiSurface::Web3,
            category: category.into(),
            method: method.into(),
            params: Value::Object(params),
            api_key: None,
        }
    }

    pub fn node(
        chain: Chain,
        category: impl Into<String>,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        Self {
            chain,
            surface: ApiSurface::Node,
            category: category.into(),
            method: method.into(),
            params: Value::Array(params),
            api_key: None,
        }
    }

    pub fn with_credential(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// JSON-RPC method name for node requests, e.g. `eth_blockNumber`.
    pub fn rpc_method(&self) -> String {
        format!("{}_{}", self.category, self.method)
    }
}

impl std::fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("chain", &self.chain)
            .field("surface", &self.surface)
            .field("category", &self.category)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ── Payload records ─────────────────────────────────────────────────

/// Reads a field that upstream may send as a string or a number.
fn lenient_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

/// Parses a raw upstream amount, treating anything non-numeric as zero.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// A single token holding of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    /// Raw balance as reported upstream (usually an integer string).
    pub balance: String,
}

impl TokenBalance {
    /// Builds a record from one upstream item. Token metadata may sit on the
    /// item itself or under a nested `contract` object.
    pub fn from_value(item: &Value) -> Self {
        let contract = item.get("contract").unwrap_or(&Value::Null);
        Self {
            contract_address: lenient_string(item, &["contractAddress"])
                .or_else(|| lenient_string(contract, &["address"])),
            symbol: lenient_string(item, &["symbol"])
                .or_else(|| lenient_string(contract, &["symbol"])),
            name: lenient_string(item, &["name"])
                .or_else(|| lenient_string(contract, &["name"])),
            decimals: lenient_u64(item, &["decimals"])
                .or_else(|| lenient_u64(contract, &["decimals"]))
                .and_then(|d| u32::try_from(d).ok()),
            balance: lenient_string(item, &["balance"]).unwrap_or_else(|| "0".to_string()),
        }
    }

    /// Balance as a float; anything unparsable counts as zero.
    pub fn balance_value(&self) -> f64 {
        parse_amount(&self.balance)
    }

    /// Display label: symbol, else the first 8 chars of the contract address.
    pub fn label(&self) -> String {
        if let Some(symbol) = self.symbol.as_deref().filter(|s| !s.is_empty()) {
            return symbol.to_string();
        }
        match self.contract_address.as_deref() {
            Some(addr) if !addr.is_empty() => addr.chars().take(8).collect(),
            _ => "Unknown".to_string(),
        }
    }
}

/// A single transaction touching an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl Transaction {
    pub fn from_value(item: &Value) -> Self {
        Self {
            hash: lenient_string(item, &["transactionHash", "hash"]),
            from: lenient_string(item, &["from"]),
            to: lenient_string(item, &["to"]),
            value: lenient_string(item, &["value"]),
            timestamp: lenient_string(item, &["timestamp"]),
            block_number: lenient_u64(item, &["blockNumber"]),
        }
    }
}

/// Pagination as reported upstream. Only the fields the source sent are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl Pagination {
    /// Copies `page`/`rpp`/`cursor`/`count` from an upstream body.
    pub fn from_page_fields(body: &Value) -> Option<Self> {
        let pagination = Self {
            page: lenient_u64(body, &["page"]),
            rpp: lenient_u64(body, &["rpp"]),
            cursor: lenient_string(body, &["cursor"]),
            count: lenient_u64(body, &["count"]),
            ..Self::default()
        };
        (pagination != Self::default()).then_some(pagination)
    }
}

// ── Response envelope ───────────────────────────────────────────────

/// Operation-specific result data. Serialized as `kind` + `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Payload {
    /// Native balance as a numeric string.
    Balance(String),
    Tokens(Vec<TokenBalance>),
    Transactions(Vec<Transaction>),
    /// Allowance as a numeric string.
    Allowance(String),
    BalanceChanges(Vec<Value>),
    Custom(Value),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Balance(_) => "balance",
            Payload::Tokens(_) => "tokens",
            Payload::Transactions(_) => "transactions",
            Payload::Allowance(_) => "allowance",
            Payload::BalanceChanges(_) => "balance_changes",
            Payload::Custom(_) => "custom",
        }
    }
}

/// Uniform wrapper returned by every data-fetch operation.
///
/// Fields are read-only once built; `retrieved_at` is stamped at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    chain: Chain,
    subject_address: Option<String>,
    #[serde(flatten)]
    payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    retrieved_at: DateTime<Utc>,
}

impl ResponseEnvelope {
    pub fn new(
        chain: Chain,
        subject_address: Option<String>,
        payload: Payload,
        pagination: Option<Pagination>,
    ) -> Self {
        Self {
            chain,
            subject_address,
            payload,
            pagination,
            retrieved_at: Utc::now(),
        }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn subject_address(&self) -> Option<&str> {
        self.subject_address.as_deref()
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn retrieved_at(&self) -> DateTime<Utc> {
        self.retrieved_at
    }
}
