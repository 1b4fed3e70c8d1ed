use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use super::chain::{Chain, ChainFamily};
use crate::errors::CoreError;

/// Lowercases and drops `_`/`-` so `WalletBalance`, `wallet_balance`
/// and `wallet-balance` all compare equal.
fn fold_enum_name(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// What the user is asking for. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    WalletBalance,
    TokenBalance,
    TransactionHistory,
    TokenAllowance,
    TokenBalanceChanges,
    CustomQuery,
    GeneralQuestion,
}

impl IntentKind {
    pub const ALL: [IntentKind; 7] = [
        IntentKind::WalletBalance,
        IntentKind::TokenBalance,
        IntentKind::TransactionHistory,
        IntentKind::TokenAllowance,
        IntentKind::TokenBalanceChanges,
        IntentKind::CustomQuery,
        IntentKind::GeneralQuestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::WalletBalance => "wallet_balance",
            IntentKind::TokenBalance => "token_balance",
            IntentKind::TransactionHistory => "transaction_history",
            IntentKind::TokenAllowance => "token_allowance",
            IntentKind::TokenBalanceChanges => "token_balance_changes",
            IntentKind::CustomQuery => "custom_query",
            IntentKind::GeneralQuestion => "general_question",
        }
    }

    /// Every kind except `GeneralQuestion` needs a data-provider call.
    pub fn requires_external_data(&self) -> bool {
        !matches!(self, IntentKind::GeneralQuestion)
    }

    /// Chain to use when none was given. Balance changes only exist on
    /// ledger chains, so a non-ledger fallback is replaced there.
    pub fn default_chain(&self, fallback: Chain) -> Chain {
        if *self != IntentKind::TokenBalanceChanges || fallback.family() == ChainFamily::Ledger {
            return fallback;
        }
        Chain::ALL
            .into_iter()
            .find(|c| c.family() == ChainFamily::Ledger)
            .unwrap_or(fallback)
    }

    /// Tolerant match used on untrusted input; see [`fold_enum_name`].
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let folded = fold_enum_name(s);
        IntentKind::ALL
            .iter()
            .copied()
            .find(|k| fold_enum_name(k.as_str()) == folded)
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentKind::parse_lenient(s).ok_or_else(|| CoreError::UnsupportedIntentKind {
            kind: s.to_string(),
            supported: IntentKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
        })
    }
}

/// Chart kinds a user may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Area,
    Scatter,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Area,
        ChartKind::Scatter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
            ChartKind::Scatter => "scatter",
        }
    }

    pub fn parse_lenient(s: &str) -> Option<Self> {
        let folded = fold_enum_name(s);
        ChartKind::ALL.iter().copied().find(|k| k.as_str() == folded)
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical structured interpretation of a user's message.
///
/// Instances coming out of the normalizer always satisfy:
/// - `requires_external_data == (kind != GeneralQuestion)`
/// - `chain` is `None` only for `GeneralQuestion`
/// - every populated address field is well-formed for `chain`'s family
///
/// Intents built by hand (tests, HTTP routes) are not checked here; the
/// dispatcher and data service re-validate what they use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub kind: IntentKind,

    #[serde(default)]
    pub chain: Option<Chain>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub contract_address: Option<String>,

    #[serde(default)]
    pub owner_address: Option<String>,

    #[serde(default)]
    pub spender_address: Option<String>,

    #[serde(default)]
    pub chart_kind: Option<ChartKind>,

    pub requires_external_data: bool,

    /// Open parameters, only read by `CustomQuery` (and the optional
    /// pagination / passthrough keys of the list operations).
    #[serde(default)]
    pub extra_params: Map<String, Value>,
}

impl Intent {
    /// The "no data needed" intent: everything empty.
    pub fn general_question() -> Self {
        Self::new(IntentKind::GeneralQuestion)
    }

    /// A bare intent of the given kind with no chain or parameters.
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            chain: None,
            address: None,
            contract_address: None,
            owner_address: None,
            spender_address: None,
            chart_kind: None,
            requires_external_data: kind.requires_external_data(),
            extra_params: Map::new(),
        }
    }

    pub fn on_chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_allowance_parties(
        mut self,
        contract: impl Into<String>,
        owner: impl Into<String>,
        spender: impl Into<String>,
    ) -> Self {
        self.contract_address = Some(contract.into());
        self.owner_address = Some(owner.into());
        self.spender_address = Some(spender.into());
        self
    }

    pub fn with_chart_kind(mut self, kind: ChartKind) -> Self {
        self.chart_kind = Some(kind);
        self
    }

    pub fn with_extra_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    /// A string-valued extra parameter, if present and non-empty.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra_params
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// A non-negative integer extra parameter. Numeric strings are accepted
    /// since LLMs quote numbers freely.
    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        match self.extra_params.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
