use serde_json::Value;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::chain::Chain;
use crate::models::intent::{ChartKind, Intent};
use crate::providers::traits::LanguageModel;
use crate::services::normalizer::normalize_intent;

/// Turns free text into a canonical [`Intent`] with one LLM call.
///
/// Extraction failures never reach the caller: a failed call, a reply
/// that is not a bare JSON object, or JSON that does not parse all
/// degrade to [`Intent::general_question`]. There is no retry.
pub struct IntentService {
    llm: Arc<dyn LanguageModel>,
    default_chain: Chain,
}

impl IntentService {
    pub fn new(llm: Arc<dyn LanguageModel>, default_chain: Chain) -> Self {
        Self { llm, default_chain }
    }

    pub async fn extract_intent(&self, message: &str) -> Intent {
        match self.extract_raw(message).await {
            Ok(raw) => {
                let intent = normalize_intent(&raw, self.default_chain);
                tracing::info!(
                    kind = %intent.kind,
                    chain = ?intent.chain,
                    chart = ?intent.chart_kind,
                    "extracted intent"
                );
                intent
            }
            Err(e) => {
                tracing::warn!(error = %e, "falling back to general question");
                Intent::general_question()
            }
        }
    }

    /// The raw (un-normalized) object the model produced.
    pub async fn extract_raw(&self, message: &str) -> Result<Value, CoreError> {
        let prompt = build_intent_prompt(message);
        let text = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| CoreError::IntentExtractionFailed(e.to_string()))?;
        parse_intent_response(&text)
    }
}

/// Strict parse of the model's reply: it must be a bare JSON object,
/// starting with `{` and ending with `}` once surrounding whitespace is
/// removed. Markdown fences are not stripped.
pub fn parse_intent_response(text: &str) -> Result<Value, CoreError> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Err(CoreError::IntentExtractionFailed(
            "reply is not a bare JSON object".into(),
        ));
    }
    serde_json::from_str(trimmed)
        .map_err(|e| CoreError::IntentExtractionFailed(format!("invalid JSON: {e}")))
}

pub fn build_intent_prompt(message: &str) -> String {
    let chains = Chain::ALL
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let charts = ChartKind::ALL
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are the intent extraction system of a blockchain data analytics assistant.
Map the user's question to exactly one JSON object of this shape and output nothing else:
{{
  "kind": "wallet_balance | token_balance | transaction_history | token_allowance | token_balance_changes | custom_query | general_question",
  "chain": "chain name or null",
  "address": "account address or null",
  "contractAddress": "token contract address or null",
  "ownerAddress": "token owner address or null",
  "spenderAddress": "token spender address or null",
  "chartKind": "chart kind or null",
  "requiresExternalData": true or false,
  "extraParams": {{}}
}}

Kinds:
- wallet_balance: native coin balance of an address.
- token_balance: all token balances held by an address.
- transaction_history: transactions of an address. Optional extraParams "limit" and "offset".
- token_allowance: how much "spenderAddress" may spend of "ownerAddress"'s tokens at "contractAddress".
- token_balance_changes: token balance changes of an XRPL account ("address" starts with "r").
- custom_query: a raw node call. extraParams must contain "category" (e.g. "eth"), "method" (e.g. "blockNumber") and optionally "params" (an array).
- general_question: anything conceptual that needs no on-chain data.

Rules:
- "chain" must be one of: {chains}. If an address is given but no chain, use "ethereum".
- Addresses must be copied exactly. If an address is missing or malformed, use null.
- "chartKind" must be one of: {charts}, and only when the user asks for a chart, graph or plot.
  Prefer "pie" for token distributions and "line" for balances.
- "requiresExternalData" is false only for general_question.
- For general_question every other field is null and "extraParams" is {{}}.
- Output only the raw JSON object, starting with {{ and ending with }}. No markdown, no code fences, no commentary.

Examples:
Question: Show me the ETH balance of 0x742d35Cc6634C0532925a3b8D4C9db96C4b4d8b6
{{"kind":"wallet_balance","chain":"ethereum","address":"0x742d35Cc6634C0532925a3b8D4C9db96C4b4d8b6","contractAddress":null,"ownerAddress":null,"spenderAddress":null,"chartKind":null,"requiresExternalData":true,"extraParams":{{}}}}

Question: Plot a pie chart of the tokens held by 0x742d35Cc6634C0532925a3b8D4C9db96C4b4d8b6 on polygon
{{"kind":"token_balance","chain":"polygon","address":"0x742d35Cc6634C0532925a3b8D4C9db96C4b4d8b6","contractAddress":null,"ownerAddress":null,"spenderAddress":null,"chartKind":"pie","requiresExternalData":true,"extraParams":{{}}}}

Question: What is the latest block number on arbitrum?
{{"kind":"custom_query","chain":"arbitrum","address":null,"contractAddress":null,"ownerAddress":null,"spenderAddress":null,"chartKind":null,"requiresExternalData":true,"extraParams":{{"category":"eth","method":"blockNumber","params":[]}}}}

Question: What is a blockchain?
{{"kind":"general_question","chain":null,"address":null,"contractAddress":null,"ownerAddress":null,"spenderAddress":null,"chartKind":null,"requiresExternalData":false,"extraParams":{{}}}}

User message: {message}"#
    )
}
